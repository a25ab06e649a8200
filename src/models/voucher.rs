// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Redeemed-voucher model (the `user_rewards` collection).

use serde::{Deserialize, Serialize};

/// How long an issued voucher stays valid.
pub const VOUCHER_VALID_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    Active,
    Used,
    Expired,
}

impl VoucherStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(VoucherStatus::Active),
            "used" => Some(VoucherStatus::Used),
            "expired" => Some(VoucherStatus::Expired),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Active => "active",
            VoucherStatus::Used => "used",
            VoucherStatus::Expired => "expired",
        }
    }
}

/// Pre-generated identity for a voucher about to be issued.
///
/// The redemption transaction reads `user_rewards/{code}` before
/// writing; if the code is already taken the attempt is reported as a
/// collision and the caller retries with a fresh draft.
#[derive(Debug, Clone)]
pub struct VoucherDraft {
    /// UUID of the redemption record
    pub id: String,
    /// Candidate voucher code
    pub code: String,
    /// Redemption timestamp (ISO 8601)
    pub redeemed_at: String,
    /// `redeemed_at` plus [`VOUCHER_VALID_DAYS`] (ISO 8601)
    pub expires_at: String,
}

/// Voucher issued by a successful redemption.
///
/// Stored in `user_rewards` with the voucher code as the document ID,
/// so the store itself enforces code uniqueness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReward {
    /// UUID of the redemption record
    pub id: String,
    pub user_id: String,
    pub reward_id: String,
    /// Point cost captured at redemption time
    pub points_spent: u32,
    pub voucher_code: String,
    pub status: VoucherStatus,
    /// When the redemption happened (ISO 8601)
    pub redeemed_at: String,
    /// When the voucher was consumed, if ever (ISO 8601)
    pub used_at: Option<String>,
    /// Redemption time plus [`VOUCHER_VALID_DAYS`] (ISO 8601)
    pub expires_at: String,
}
