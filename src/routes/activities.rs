// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity submission and listing routes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::activity::{
    Activity, ActivityLocation, ActivityStatus, ActivityType, MediaKind, VerificationMedia,
    DESCRIPTION_MAX_LEN, MAX_VERIFICATION_FILES, TITLE_MAX_LEN, UNIT_MAX_LEN,
};
use crate::pagination::{default_page, PageMeta, PageParams};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/activities", post(submit_activity).get(get_activities))
}

// ─── DTOs ────────────────────────────────────────────────────

/// Short form of an activity, used in submission receipts and
/// recent-activity lists.
#[derive(Serialize, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub title: String,
    pub status: String,
    pub points_earned: u32,
    pub carbon_saved: f64,
    pub submitted_at: String,
}

impl ActivitySummary {
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            id: activity.id.clone(),
            activity_type: activity.activity_type.as_str().to_string(),
            title: activity.title.clone(),
            status: activity.status.as_str().to_string(),
            points_earned: activity.points_earned,
            carbon_saved: activity.carbon_saved,
            submitted_at: activity.submitted_at.clone(),
        }
    }
}

#[derive(Serialize, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct MediaDetail {
    #[serde(rename = "type")]
    pub media_type: String,
    pub url: String,
    pub filename: String,
}

#[derive(Serialize, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LocationDetail {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub address: String,
    pub captured_at: String,
}

/// Full view of an activity, including the proof attachments the
/// review screens need.
#[derive(Serialize, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetail {
    pub id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub title: String,
    pub description: String,
    pub quantity: u32,
    pub unit: Option<String>,
    pub verification_media: Vec<MediaDetail>,
    pub location: LocationDetail,
    pub status: String,
    pub points_earned: u32,
    pub carbon_saved: f64,
    pub rejection_reason: Option<String>,
    pub verified_by: Option<String>,
    pub verified_at: Option<String>,
    pub submitted_at: String,
}

impl ActivityDetail {
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            id: activity.id.clone(),
            activity_type: activity.activity_type.as_str().to_string(),
            title: activity.title.clone(),
            description: activity.description.clone(),
            quantity: activity.quantity,
            unit: activity.unit.clone(),
            verification_media: activity
                .verification_media
                .iter()
                .map(|m| MediaDetail {
                    media_type: m.media_type.as_str().to_string(),
                    url: m.url.clone(),
                    filename: m.filename.clone(),
                })
                .collect(),
            location: LocationDetail {
                latitude: activity.location.latitude,
                longitude: activity.location.longitude,
                accuracy: activity.location.accuracy,
                address: activity.location.address.clone(),
                captured_at: activity.location.captured_at.clone(),
            },
            status: activity.status.as_str().to_string(),
            points_earned: activity.points_earned,
            carbon_saved: activity.carbon_saved,
            rejection_reason: activity.rejection_reason.clone(),
            verified_by: activity.verified_by.clone(),
            verified_at: activity.verified_at.clone(),
            submitted_at: activity.submitted_at.clone(),
        }
    }
}

// ─── Submission ──────────────────────────────────────────────

/// Submission payload. Everything is optional at the serde level so
/// we can answer missing fields with a message instead of a bare 422.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitActivityRequest {
    #[serde(rename = "type")]
    activity_type: Option<String>,
    title: Option<String>,
    description: Option<String>,
    quantity: Option<u32>,
    unit: Option<String>,
    #[serde(default)]
    verification_media: Vec<MediaPayload>,
    location: Option<LocationPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    #[serde(rename = "type")]
    media_type: Option<String>,
    url: Option<String>,
    filename: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
    address: Option<String>,
    captured_at: Option<String>,
}

/// Validate a submission payload and turn it into a pending activity.
///
/// `points_earned` and `carbon_saved` are advisory estimates at this
/// point; approval recomputes the award from the stored fields.
fn build_activity(payload: SubmitActivityRequest, user_id: &str, now: &str) -> Result<Activity> {
    let type_raw = payload.activity_type.as_deref().map(str::trim).unwrap_or("");
    let title = payload.title.as_deref().map(str::trim).unwrap_or("");
    let description = payload.description.as_deref().map(str::trim).unwrap_or("");

    if type_raw.is_empty() || title.is_empty() || description.is_empty() {
        return Err(AppError::BadRequest(
            "Type, title, and description are required".to_string(),
        ));
    }

    let activity_type = ActivityType::parse(type_raw)
        .ok_or_else(|| AppError::BadRequest("Invalid activity type".to_string()))?;

    if title.chars().count() > TITLE_MAX_LEN {
        return Err(AppError::BadRequest(format!(
            "Title must be {} characters or fewer",
            TITLE_MAX_LEN
        )));
    }
    if description.chars().count() > DESCRIPTION_MAX_LEN {
        return Err(AppError::BadRequest(format!(
            "Description must be {} characters or fewer",
            DESCRIPTION_MAX_LEN
        )));
    }

    let quantity = match payload.quantity {
        None => 1,
        Some(0) => {
            return Err(AppError::BadRequest(
                "Quantity must be at least 1".to_string(),
            ))
        }
        Some(q) => q,
    };

    let unit = match payload.unit.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(u) if u.chars().count() > UNIT_MAX_LEN => {
            return Err(AppError::BadRequest(format!(
                "Unit must be {} characters or fewer",
                UNIT_MAX_LEN
            )))
        }
        Some(u) => Some(u.to_string()),
    };

    if payload.verification_media.is_empty() {
        return Err(AppError::BadRequest(
            "At least one photo or video is required for verification".to_string(),
        ));
    }
    if payload.verification_media.len() > MAX_VERIFICATION_FILES {
        return Err(AppError::BadRequest(format!(
            "Maximum {} files allowed for verification",
            MAX_VERIFICATION_FILES
        )));
    }

    let mut media = Vec::with_capacity(payload.verification_media.len());
    for entry in &payload.verification_media {
        let kind = entry.media_type.as_deref().and_then(MediaKind::parse);
        let url = entry.url.as_deref().map(str::trim).unwrap_or("");
        let filename = entry.filename.as_deref().map(str::trim).unwrap_or("");

        match kind {
            Some(kind) if !url.is_empty() && !filename.is_empty() => {
                media.push(VerificationMedia {
                    media_type: kind,
                    url: url.to_string(),
                    filename: filename.to_string(),
                });
            }
            _ => {
                return Err(AppError::BadRequest(
                    "Each verification file needs a valid type, url, and filename".to_string(),
                ))
            }
        }
    }

    let location = match payload.location {
        Some(LocationPayload {
            latitude: Some(latitude),
            longitude: Some(longitude),
            accuracy,
            address: Some(address),
            captured_at,
        }) if !address.trim().is_empty() => ActivityLocation {
            latitude,
            longitude,
            accuracy,
            address: address.trim().to_string(),
            captured_at: captured_at.unwrap_or_else(|| now.to_string()),
        },
        _ => {
            return Err(AppError::BadRequest(
                "Complete location data is required for verification".to_string(),
            ))
        }
    };

    Ok(Activity {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        activity_type,
        title: title.to_string(),
        description: description.to_string(),
        quantity,
        unit,
        verification_media: media,
        location,
        status: ActivityStatus::Pending,
        points_earned: activity_type.points_for(quantity),
        carbon_saved: activity_type.carbon_for(quantity),
        rejection_reason: None,
        verified_by: None,
        verified_at: None,
        submitted_at: now.to_string(),
    })
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SubmitActivityResponse {
    pub message: String,
    pub activity: ActivitySummary,
    /// Advisory that the listed points stay provisional until review.
    pub notice: String,
}

/// Submit an eco-activity claim for admin review.
async fn submit_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SubmitActivityRequest>,
) -> Result<(StatusCode, Json<SubmitActivityResponse>)> {
    let now = format_utc_rfc3339(chrono::Utc::now());
    let activity = build_activity(payload, &user.user_id, &now)?;

    state.db.upsert_activity(&activity).await?;

    tracing::info!(
        user_id = %user.user_id,
        activity_id = %activity.id,
        activity_type = activity.activity_type.as_str(),
        quantity = activity.quantity,
        "Activity submitted for verification"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitActivityResponse {
            message: "Activity submitted successfully! It will be reviewed by our admin team."
                .to_string(),
            activity: ActivitySummary::from_activity(&activity),
            notice: "Your activity is pending verification. Points will be awarded once \
                     approved by admin."
                .to_string(),
        }),
    ))
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ActivitiesQuery {
    /// Filter by verification status; "all" disables the filter
    status: Option<String>,
    /// Filter by category; "all" disables the filter
    #[serde(rename = "type")]
    activity_type: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    10
}

pub(crate) fn parse_status_filter(raw: Option<&str>) -> Result<Option<ActivityStatus>> {
    match raw {
        None | Some("all") => Ok(None),
        Some(value) => ActivityStatus::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest("Invalid status filter".to_string())),
    }
}

pub(crate) fn parse_type_filter(raw: Option<&str>) -> Result<Option<ActivityType>> {
    match raw {
        None | Some("all") => Ok(None),
        Some(value) => ActivityType::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest("Invalid activity type".to_string())),
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivityDetail>,
    pub pagination: PageMeta,
}

/// Get the caller's own activities with optional filtering.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    tracing::debug!(
        user_id = %user.user_id,
        status = ?params.status,
        activity_type = ?params.activity_type,
        page = params.page,
        "Fetching activities"
    );

    let page = PageParams::new(params.page, params.limit)?;
    let status = parse_status_filter(params.status.as_deref())?;
    let type_filter = parse_type_filter(params.activity_type.as_deref())?;

    let mut activities = state
        .db
        .list_activities_for_user(&user.user_id, status, type_filter)
        .await?;

    // Newest first. Uniform RFC3339 timestamps compare chronologically.
    activities.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

    let meta = page.meta(activities.len());
    let page_items = page.slice(&activities)?;

    Ok(Json(ActivitiesResponse {
        activities: page_items.iter().map(ActivityDetail::from_activity).collect(),
        pagination: meta,
    }))
}
