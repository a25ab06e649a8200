// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Partner reward catalog model.

use serde::{Deserialize, Serialize};

/// Catalog categories for browsing/filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardCategory {
    Food,
    Fashion,
    Electronics,
    Travel,
    Health,
    Entertainment,
    Other,
}

impl RewardCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "food" => Some(RewardCategory::Food),
            "fashion" => Some(RewardCategory::Fashion),
            "electronics" => Some(RewardCategory::Electronics),
            "travel" => Some(RewardCategory::Travel),
            "health" => Some(RewardCategory::Health),
            "entertainment" => Some(RewardCategory::Entertainment),
            "other" => Some(RewardCategory::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RewardCategory::Food => "food",
            RewardCategory::Fashion => "fashion",
            RewardCategory::Electronics => "electronics",
            RewardCategory::Travel => "travel",
            RewardCategory::Health => "health",
            RewardCategory::Entertainment => "entertainment",
            RewardCategory::Other => "other",
        }
    }
}

/// Why a reward cannot be redeemed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Redeemable,
    /// Deactivated or past its validity window
    Unavailable,
    /// Redemption limit reached
    SoldOut,
}

/// Stored reward record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    /// UUID (also used as document ID)
    pub id: String,
    pub title: String,
    pub description: String,
    /// Partner brand name
    pub brand: String,
    /// Percentage off, for discount-style rewards
    pub discount_percentage: Option<u32>,
    /// Flat amount off, for fixed-value rewards
    pub discount_amount: Option<f64>,
    pub points_cost: u32,
    pub category: RewardCategory,
    pub image_url: Option<String>,
    pub terms_and_conditions: Option<String>,
    /// Last instant the reward may be redeemed (ISO 8601)
    pub valid_until: String,
    pub max_redemptions: u32,
    pub current_redemptions: u32,
    pub is_active: bool,
    /// When the reward entered the catalog (ISO 8601)
    pub created_at: String,
}

impl Reward {
    /// Availability at `now` (RFC3339 string; uniform formatting makes
    /// lexicographic comparison chronological). Deactivation and expiry
    /// are reported before the redemption limit.
    pub fn availability(&self, now: &str) -> Availability {
        if !self.is_active || self.valid_until.as_str() <= now {
            Availability::Unavailable
        } else if self.current_redemptions >= self.max_redemptions {
            Availability::SoldOut
        } else {
            Availability::Redeemable
        }
    }
}
