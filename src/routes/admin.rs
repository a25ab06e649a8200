// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin verification routes: review queue, approve, reject.
//!
//! All routes here are layered behind both the auth middleware and the
//! admin role check (see routes/mod.rs).

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::firestore::{ApproveOutcome, RejectOutcome};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::activity::{Activity, ActivityStatus, REJECTION_REASON_MAX_LEN};
use crate::models::User;
use crate::pagination::{default_page, PageMeta, PageParams};
use crate::routes::activities::{parse_status_filter, ActivityDetail, ActivitySummary};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/activities", get(get_review_queue))
        .route("/admin/activities/{id}/approve", post(approve_activity))
        .route("/admin/activities/{id}/reject", post(reject_activity))
}

// ─── Review Queue ────────────────────────────────────────────

#[derive(Deserialize)]
struct ReviewQueueQuery {
    /// Defaults to the pending queue; "all" shows every status
    status: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    20
}

/// Collection-wide totals per status, shown as queue badges.
#[derive(Serialize, Default, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: u32,
    pub approved: u32,
    pub rejected: u32,
}

fn count_statuses(activities: &[Activity]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for activity in activities {
        match activity.status {
            ActivityStatus::Pending => counts.pending += 1,
            ActivityStatus::Approved => counts.approved += 1,
            ActivityStatus::Rejected => counts.rejected += 1,
        }
    }
    counts
}

/// The account that submitted an activity, embedded in queue entries.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SubmitterSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl SubmitterSummary {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueueEntry {
    #[serde(flatten)]
    pub activity: ActivityDetail,
    /// None when the submitting account has been deleted.
    pub user: Option<SubmitterSummary>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueueResponse {
    pub activities: Vec<ReviewQueueEntry>,
    pub counts: StatusCounts,
    pub pagination: PageMeta,
}

/// List activities for review with submitter details embedded.
///
/// One collection fetch serves both the filtered page and the status
/// badge counts.
async fn get_review_queue(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Query(params): Query<ReviewQueueQuery>,
) -> Result<Json<ReviewQueueResponse>> {
    tracing::debug!(
        admin_id = %admin.user_id,
        status = ?params.status,
        page = params.page,
        "Fetching review queue"
    );

    let page = PageParams::new(params.page, params.limit)?;
    let status = parse_status_filter(Some(params.status.as_deref().unwrap_or("pending")))?;

    let all = state.db.list_activities(None).await?;
    let counts = count_statuses(&all);

    let mut queue: Vec<Activity> = all
        .into_iter()
        .filter(|a| status.map_or(true, |s| a.status == s))
        .collect();
    queue.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

    let meta = page.meta(queue.len());
    let page_items = page.slice(&queue)?;

    let mut user_ids: Vec<String> = page_items.iter().map(|a| a.user_id.clone()).collect();
    user_ids.sort();
    user_ids.dedup();
    let users = state.db.get_users_by_ids(&user_ids).await?;

    let entries = page_items
        .iter()
        .map(|a| ReviewQueueEntry {
            activity: ActivityDetail::from_activity(a),
            user: users.get(&a.user_id).map(SubmitterSummary::from_user),
        })
        .collect();

    Ok(Json(ReviewQueueResponse {
        activities: entries,
        counts,
        pagination: meta,
    }))
}

// ─── Approve / Reject ────────────────────────────────────────

/// The owner's counters after an approval.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub points: u32,
    pub total_points_earned: u32,
    pub level: u32,
    pub activities_completed: u32,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ApproveResponse {
    pub message: String,
    pub activity: ActivitySummary,
    pub points_awarded: u32,
    pub user: UserProgress,
}

/// Approve a pending activity, awarding points to its submitter.
async fn approve_activity(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(activity_id): Path<String>,
) -> Result<Json<ApproveResponse>> {
    let outcome = state
        .db
        .approve_activity_atomic(&activity_id, &admin.user_id)
        .await?;

    match outcome {
        ApproveOutcome::Approved { activity, user } => Ok(Json(ApproveResponse {
            message: "Activity approved successfully".to_string(),
            points_awarded: activity.points_earned,
            activity: ActivitySummary::from_activity(&activity),
            user: UserProgress {
                points: user.points,
                total_points_earned: user.total_points_earned,
                level: user.level,
                activities_completed: user.activities_completed,
            },
        })),
        ApproveOutcome::ActivityNotFound => Err(AppError::NotFound(format!(
            "Activity {} not found",
            activity_id
        ))),
        ApproveOutcome::UserNotFound => Err(AppError::NotFound(format!(
            "User for activity {} not found",
            activity_id
        ))),
        ApproveOutcome::AlreadyProcessed => Err(AppError::Conflict(
            "Activity has already been processed".to_string(),
        )),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RejectResponse {
    pub message: String,
    pub activity: ActivityDetail,
}

/// Reject a pending activity with a reason for the submitter.
///
/// The reason is validated before any database read so a bad request
/// never opens a transaction.
async fn reject_activity(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(activity_id): Path<String>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<RejectResponse>> {
    let reason = payload.reason.as_deref().map(str::trim).unwrap_or("");
    if reason.is_empty() {
        return Err(AppError::BadRequest(
            "Rejection reason is required".to_string(),
        ));
    }
    if reason.chars().count() > REJECTION_REASON_MAX_LEN {
        return Err(AppError::BadRequest(format!(
            "Rejection reason must be {} characters or fewer",
            REJECTION_REASON_MAX_LEN
        )));
    }

    let outcome = state
        .db
        .reject_activity_atomic(&activity_id, &admin.user_id, reason)
        .await?;

    match outcome {
        RejectOutcome::Rejected { activity } => Ok(Json(RejectResponse {
            message: "Activity rejected".to_string(),
            activity: ActivityDetail::from_activity(&activity),
        })),
        RejectOutcome::ActivityNotFound => Err(AppError::NotFound(format!(
            "Activity {} not found",
            activity_id
        ))),
        RejectOutcome::AlreadyProcessed => Err(AppError::Conflict(
            "Activity has already been processed".to_string(),
        )),
    }
}
