// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod reward;
pub mod stats;
pub mod user;
pub mod voucher;

pub use activity::{Activity, ActivityStatus, ActivityType};
pub use reward::Reward;
pub use user::User;
pub use voucher::UserReward;
