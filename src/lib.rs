// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Greenify: gamified sustainability tracking backend
//!
//! This crate provides the backend API for logging eco-friendly
//! activities, verifying them, and redeeming earned points for
//! partner-brand vouchers.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
}
