// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use greenify::config::Config;
use greenify::db::FirestoreDb;
use greenify::middleware::auth::create_session_jwt;
use greenify::models::user::Role;
use greenify::routes::create_router;
use greenify::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();

    let state = Arc::new(AppState { config, db });

    (create_router(state.clone()), state)
}

/// Like [`create_test_app`], but with an explicit frontend URL so tests
/// can exercise scheme-dependent cookie attributes.
#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    let db = test_db_offline();

    let state = Arc::new(AppState { config, db });

    (create_router(state.clone()), state)
}

/// Create a session JWT the way the auth routes do.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    create_session_jwt(user_id, Role::User, signing_key).expect("Failed to create JWT")
}

/// Create a session JWT carrying the admin role.
#[allow(dead_code)]
pub fn create_admin_jwt(user_id: &str, signing_key: &[u8]) -> String {
    create_session_jwt(user_id, Role::Admin, signing_key).expect("Failed to create JWT")
}
