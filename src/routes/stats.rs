// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Statistics routes: user dashboard, leaderboard, platform totals.

use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::activity::{Activity, ActivityStatus};
use crate::models::stats::{
    compare_leaderboard, compute_platform_stats, compute_user_stats, TypeBreakdown,
};
use crate::pagination::{default_page, PageMeta, PageParams};
use crate::routes::activities::ActivitySummary;
use crate::AppState;

/// How many of the user's latest submissions ride along with their stats.
const RECENT_ACTIVITIES: usize = 5;
/// How many recently verified activities the public stats include.
const RECENT_VERIFIED: usize = 10;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/stats", get(get_user_stats))
        .route("/leaderboard", get(get_leaderboard))
}

/// Platform statistics are the landing-page numbers, served without a
/// session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/stats/platform", get(get_platform_stats))
}

// ─── Shared DTOs ─────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct TypeBreakdownResponse {
    pub count: u32,
    pub points: u32,
    pub carbon: f64,
}

fn breakdown_response(
    breakdown: HashMap<String, TypeBreakdown>,
) -> HashMap<String, TypeBreakdownResponse> {
    breakdown
        .into_iter()
        .map(|(key, slice)| {
            (
                key,
                TypeBreakdownResponse {
                    count: slice.count,
                    points: slice.points,
                    carbon: slice.carbon,
                },
            )
        })
        .collect()
}

// ─── User Stats ──────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyProgressResponse {
    /// "YYYY-MM"
    pub month: String,
    pub activities: u32,
    pub points: u32,
    pub carbon: f64,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub points: u32,
    pub total_points_earned: u32,
    pub level: u32,
    pub activities_completed: u32,
    pub total_activities: u32,
    pub pending_activities: u32,
    pub approved_activities: u32,
    pub rejected_activities: u32,
    pub carbon_saved: f64,
    pub completion_rate: u32,
    pub current_streak: u32,
    pub activity_breakdown: HashMap<String, TypeBreakdownResponse>,
    pub monthly_progress: Vec<MonthlyProgressResponse>,
    pub recent_activities: Vec<ActivitySummary>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsEnvelope {
    pub stats: UserStatsResponse,
}

/// Dashboard statistics for the authenticated user.
async fn get_user_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserStatsEnvelope>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    let mut activities = state
        .db
        .list_activities_for_user(&user.user_id, None, None)
        .await?;
    activities.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

    let today = chrono::Utc::now().date_naive();
    let stats = compute_user_stats(&activities, today);

    let recent_activities = activities
        .iter()
        .take(RECENT_ACTIVITIES)
        .map(ActivitySummary::from_activity)
        .collect();

    Ok(Json(UserStatsEnvelope {
        stats: UserStatsResponse {
            points: profile.points,
            total_points_earned: profile.total_points_earned,
            level: profile.level,
            activities_completed: profile.activities_completed,
            total_activities: stats.total_activities,
            pending_activities: stats.pending_activities,
            approved_activities: stats.approved_activities,
            rejected_activities: stats.rejected_activities,
            carbon_saved: stats.carbon_saved,
            completion_rate: stats.completion_rate,
            current_streak: stats.current_streak,
            activity_breakdown: breakdown_response(stats.breakdown),
            monthly_progress: stats
                .monthly_progress
                .into_iter()
                .map(|m| MonthlyProgressResponse {
                    month: m.month,
                    activities: m.activities,
                    points: m.points,
                    carbon: m.carbon,
                })
                .collect(),
            recent_activities,
        },
    }))
}

// ─── Leaderboard ─────────────────────────────────────────────

#[derive(Deserialize)]
struct LeaderboardQuery {
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    10
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub id: String,
    pub name: String,
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
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    /// The caller's global rank; None if their account vanished.
    pub current_user_rank: Option<u32>,
    pub pagination: PageMeta,
}

/// Rank users by lifetime points.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>> {
    let page = PageParams::new(params.page, params.limit)?;

    let mut users = state.db.list_users().await?;
    users.sort_by(compare_leaderboard);

    let current_user_rank = users
        .iter()
        .position(|u| u.id == user.user_id)
        .map(|i| i as u32 + 1);

    let meta = page.meta(users.len());
    let page_items = page.slice(&users)?;

    // Ranks continue across pages; slice() already validated the offset.
    let start = (page.page as usize - 1).saturating_mul(page.limit as usize);
    let leaderboard = page_items
        .iter()
        .enumerate()
        .map(|(i, u)| LeaderboardEntry {
            rank: (start + i + 1) as u32,
            id: u.id.clone(),
            name: u.name.clone(),
            total_points_earned: u.total_points_earned,
            level: u.level,
            activities_completed: u.activities_completed,
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        leaderboard,
        current_user_rank,
        pagination: meta,
    }))
}

// ─── Platform Stats ──────────────────────────────────────────

/// One recently verified activity, shown on the public landing page.
/// Deliberately carries no user information.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedActivitySummary {
    #[serde(rename = "type")]
    pub activity_type: String,
    pub title: String,
    pub points_earned: u32,
    pub carbon_saved: f64,
    pub verified_at: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyGrowthResponse {
    /// "YYYY-MM"
    pub month: String,
    pub new_users: u32,
    pub approved_activities: u32,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatsResponse {
    pub total_users: u32,
    pub total_activities: u32,
    pub pending_activities: u32,
    pub approved_activities: u32,
    pub rejected_activities: u32,
    pub total_points_awarded: u32,
    pub total_carbon_saved: f64,
    pub approval_rate: u32,
    pub active_users: u32,
    pub activity_breakdown: HashMap<String, TypeBreakdownResponse>,
    pub monthly_growth: Vec<MonthlyGrowthResponse>,
    pub recent_activities: Vec<VerifiedActivitySummary>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatsEnvelope {
    pub stats: PlatformStatsResponse,
}

/// Platform-wide statistics (public).
async fn get_platform_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PlatformStatsEnvelope>> {
    let users = state.db.list_users().await?;
    let activities = state.db.list_activities(None).await?;

    let today = chrono::Utc::now().date_naive();
    let stats = compute_platform_stats(&users, &activities, today);

    let mut verified: Vec<&Activity> = activities
        .iter()
        .filter(|a| a.status == ActivityStatus::Approved && a.verified_at.is_some())
        .collect();
    verified.sort_by(|a, b| b.verified_at.cmp(&a.verified_at));
    let recent_activities = verified
        .into_iter()
        .take(RECENT_VERIFIED)
        .map(|a| VerifiedActivitySummary {
            activity_type: a.activity_type.as_str().to_string(),
            title: a.title.clone(),
            points_earned: a.points_earned,
            carbon_saved: a.carbon_saved,
            verified_at: a.verified_at.clone(),
        })
        .collect();

    Ok(Json(PlatformStatsEnvelope {
        stats: PlatformStatsResponse {
            total_users: stats.total_users,
            total_activities: stats.total_activities,
            pending_activities: stats.pending_activities,
            approved_activities: stats.approved_activities,
            rejected_activities: stats.rejected_activities,
            total_points_awarded: stats.total_points_awarded,
            total_carbon_saved: stats.total_carbon_saved,
            approval_rate: stats.approval_rate,
            active_users: stats.active_users,
            activity_breakdown: breakdown_response(stats.breakdown),
            monthly_growth: stats
                .monthly_growth
                .into_iter()
                .map(|m| MonthlyGrowthResponse {
                    month: m.month,
                    new_users: m.new_users,
                    approved_activities: m.approved_activities,
                })
                .collect(),
            recent_activities,
        },
    }))
}
