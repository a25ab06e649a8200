// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward catalog, redemption, and voucher routes.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::firestore::RedeemOutcome;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::reward::RewardCategory;
use crate::models::voucher::VoucherStatus;
use crate::models::{Reward, UserReward};
use crate::pagination::{default_page, PageMeta, PageParams};
use crate::services::redemption;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/rewards", get(get_rewards))
        .route("/rewards/redeem", post(redeem_reward))
        .route("/user/vouchers", get(get_vouchers))
}

// ─── Catalog ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct RewardsQuery {
    /// Filter by category; "all" disables the filter
    category: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    20
}

fn parse_category_filter(raw: Option<&str>) -> Result<Option<RewardCategory>> {
    match raw {
        None | Some("all") => Ok(None),
        Some(value) => RewardCategory::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest("Invalid reward category".to_string())),
    }
}

#[derive(Serialize, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RewardResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub brand: String,
    pub discount_percentage: Option<u32>,
    pub discount_amount: Option<f64>,
    pub points_cost: u32,
    pub category: String,
    pub image_url: Option<String>,
    pub terms_and_conditions: Option<String>,
    pub valid_until: String,
    pub max_redemptions: u32,
    pub current_redemptions: u32,
}

impl RewardResponse {
    fn from_reward(reward: &Reward) -> Self {
        Self {
            id: reward.id.clone(),
            title: reward.title.clone(),
            description: reward.description.clone(),
            brand: reward.brand.clone(),
            discount_percentage: reward.discount_percentage,
            discount_amount: reward.discount_amount,
            points_cost: reward.points_cost,
            category: reward.category.as_str().to_string(),
            image_url: reward.image_url.clone(),
            terms_and_conditions: reward.terms_and_conditions.clone(),
            valid_until: reward.valid_until.clone(),
            max_redemptions: reward.max_redemptions,
            current_redemptions: reward.current_redemptions,
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
pub struct RewardsResponse {
    pub rewards: Vec<RewardResponse>,
    pub pagination: PageMeta,
}

/// Browse redeemable rewards, cheapest first.
async fn get_rewards(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RewardsQuery>,
) -> Result<Json<RewardsResponse>> {
    tracing::debug!(
        user_id = %user.user_id,
        category = ?params.category,
        page = params.page,
        "Fetching reward catalog"
    );

    let page = PageParams::new(params.page, params.limit)?;
    let category = parse_category_filter(params.category.as_deref())?;

    let mut rewards = state.db.list_active_rewards(category).await?;

    // Expiry is a moving target, so the validity window is checked
    // here rather than in the stored query.
    let now = format_utc_rfc3339(chrono::Utc::now());
    rewards.retain(|r| r.valid_until.as_str() > now.as_str());
    rewards.sort_by(|a, b| {
        a.points_cost
            .cmp(&b.points_cost)
            .then_with(|| a.title.cmp(&b.title))
    });

    let meta = page.meta(rewards.len());
    let page_items = page.slice(&rewards)?;

    Ok(Json(RewardsResponse {
        rewards: page_items.iter().map(RewardResponse::from_reward).collect(),
        pagination: meta,
    }))
}

// ─── Redemption ──────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    reward_id: Option<String>,
}

/// Catalog entry embedded in a voucher.
#[derive(Serialize, Clone)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummary {
    pub id: String,
    pub title: String,
    pub brand: String,
    pub description: String,
    pub category: String,
    pub image_url: Option<String>,
}

impl RewardSummary {
    fn from_reward(reward: &Reward) -> Self {
        Self {
            id: reward.id.clone(),
            title: reward.title.clone(),
            brand: reward.brand.clone(),
            description: reward.description.clone(),
            category: reward.category.as_str().to_string(),
            image_url: reward.image_url.clone(),
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
pub struct VoucherResponse {
    pub id: String,
    pub voucher_code: String,
    pub status: String,
    pub points_spent: u32,
    pub redeemed_at: String,
    pub used_at: Option<String>,
    pub expires_at: String,
    /// None when the catalog entry has since been deleted.
    pub reward: Option<RewardSummary>,
}

impl VoucherResponse {
    fn from_voucher(voucher: &UserReward, reward: Option<&Reward>) -> Self {
        Self {
            id: voucher.id.clone(),
            voucher_code: voucher.voucher_code.clone(),
            status: voucher.status.as_str().to_string(),
            points_spent: voucher.points_spent,
            redeemed_at: voucher.redeemed_at.clone(),
            used_at: voucher.used_at.clone(),
            expires_at: voucher.expires_at.clone(),
            reward: reward.map(RewardSummary::from_reward),
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
pub struct RedeemResponse {
    pub message: String,
    pub voucher: VoucherResponse,
    /// Remaining spendable balance after the deduction.
    pub user_points: u32,
}

/// Spend points on a reward and receive a voucher code.
async fn redeem_reward(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<RedeemRequest>,
) -> Result<Json<RedeemResponse>> {
    let reward_id = payload.reward_id.as_deref().map(str::trim).unwrap_or("");
    if reward_id.is_empty() {
        return Err(AppError::BadRequest("Reward ID is required".to_string()));
    }

    let outcome = redemption::redeem(&state.db, &user.user_id, reward_id).await?;

    match outcome {
        RedeemOutcome::Redeemed {
            voucher,
            reward,
            user: owner,
        } => Ok(Json(RedeemResponse {
            message: "Reward redeemed successfully".to_string(),
            voucher: VoucherResponse::from_voucher(&voucher, Some(&reward)),
            user_points: owner.points,
        })),
        RedeemOutcome::UserNotFound => Err(AppError::NotFound("User not found".to_string())),
        RedeemOutcome::RewardNotFound => Err(AppError::NotFound("Reward not found".to_string())),
        RedeemOutcome::Unavailable => Err(AppError::Conflict(
            "This reward is no longer available".to_string(),
        )),
        RedeemOutcome::SoldOut => Err(AppError::Conflict(
            "This reward has reached its redemption limit".to_string(),
        )),
        RedeemOutcome::InsufficientPoints {
            required,
            available,
        } => Err(AppError::Conflict(format!(
            "Insufficient points. You need {} points but have {}",
            required, available
        ))),
        RedeemOutcome::CodeCollision => Err(AppError::Internal(anyhow::anyhow!(
            "Voucher code collision escaped the retry loop"
        ))),
    }
}

// ─── Voucher Listing ─────────────────────────────────────────

#[derive(Deserialize)]
struct VouchersQuery {
    /// Filter by voucher status; "all" disables the filter
    status: Option<String>,
    #[serde(default = "default_page")]
    page: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn parse_voucher_status_filter(raw: Option<&str>) -> Result<Option<VoucherStatus>> {
    match raw {
        None | Some("all") => Ok(None),
        Some(value) => VoucherStatus::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest("Invalid voucher status".to_string())),
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct VouchersResponse {
    pub vouchers: Vec<VoucherResponse>,
    pub pagination: PageMeta,
}

/// List the caller's vouchers, newest first, with catalog details
/// embedded.
async fn get_vouchers(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<VouchersQuery>,
) -> Result<Json<VouchersResponse>> {
    tracing::debug!(
        user_id = %user.user_id,
        status = ?params.status,
        page = params.page,
        "Fetching vouchers"
    );

    let page = PageParams::new(params.page, params.limit)?;
    let status = parse_voucher_status_filter(params.status.as_deref())?;

    let mut vouchers = state
        .db
        .list_vouchers_for_user(&user.user_id, status)
        .await?;
    vouchers.sort_by(|a, b| b.redeemed_at.cmp(&a.redeemed_at));

    let meta = page.meta(vouchers.len());
    let page_items = page.slice(&vouchers)?;

    let mut reward_ids: Vec<String> = page_items.iter().map(|v| v.reward_id.clone()).collect();
    reward_ids.sort();
    reward_ids.dedup();
    let rewards = state.db.get_rewards_by_ids(&reward_ids).await?;

    let vouchers_out = page_items
        .iter()
        .map(|v| VoucherResponse::from_voucher(v, rewards.get(&v.reward_id)))
        .collect();

    Ok(Json(VouchersResponse {
        vouchers: vouchers_out,
        pagination: meta,
    }))
}
