// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password registration and session routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::db::firestore::RegisterOutcome;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_session_jwt, AuthUser, SESSION_COOKIE, SESSION_TTL_DAYS};
use crate::models::User;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

/// Routes that work without a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

/// Routes mounted behind the auth middleware (see routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/me", get(get_me))
}

// ─── Session Cookie ──────────────────────────────────────────

/// Build the session cookie. `Secure` is keyed off the frontend URL
/// scheme so local HTTP development still gets a cookie the browser
/// will send back.
fn session_cookie(jwt: String, frontend_url: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, jwt))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(frontend_url.starts_with("https://"))
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Removal cookie: same attributes, empty value, Max-Age=0.
/// Attributes must match the session cookie or browsers keep the old one.
fn removal_cookie(frontend_url: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(frontend_url.starts_with("https://"))
        .max_age(time::Duration::ZERO)
        .build()
}

// ─── DTOs ────────────────────────────────────────────────────

/// Public view of a user account. Never carries the password hash.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub points: u32,
    pub total_points_earned: u32,
    pub level: u32,
    pub activities_completed: u32,
    pub created_at: String,
}

impl UserProfile {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.as_str().to_string(),
            points: user.points,
            total_points_earned: user.total_points_earned,
            level: user.level,
            activities_completed: user.activities_completed,
            created_at: user.created_at.clone(),
        }
    }
}

/// Response for register and login. The token is also set as an
/// HttpOnly cookie; the body copy is for non-browser clients that
/// prefer an Authorization header.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

// ─── Registration ────────────────────────────────────────────

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 60, message = "Name must be between 1 and 60 characters"))]
    name: String,
    #[validate(email(message = "A valid email address is required"))]
    email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: String,
}

/// Pull one human-readable message out of a validation failure.
fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .into_values()
        .flat_map(|errs| errs.iter())
        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .next()
        .unwrap_or_else(|| "Invalid request".to_string())
}

/// Create a new account and open a session for it.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(first_validation_message(&e)))?;

    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    // Emails are stored lowercased so lookups are case-insensitive.
    let email = payload.email.trim().to_lowercase();

    // The lookup catches most duplicates before the password is
    // hashed; the claim written inside create_user_atomic is what
    // closes the race between two registrations for one address.
    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&payload.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

    let now = format_utc_rfc3339(chrono::Utc::now());
    let user = User::new_registered(
        uuid::Uuid::new_v4().to_string(),
        name,
        email,
        password_hash,
        now,
    );

    match state.db.create_user_atomic(&user).await? {
        RegisterOutcome::Registered => {}
        RegisterOutcome::EmailTaken => {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
    }

    let jwt = create_session_jwt(&user.id, user.role, &state.config.jwt_signing_key)?;

    let cookie = session_cookie(jwt.clone(), &state.config.frontend_url);
    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(SessionResponse {
            message: "User registered successfully".to_string(),
            token: jwt,
            user: UserProfile::from_user(&user),
        }),
    ))
}

// ─── Login / Logout ──────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// Verify credentials and open a session.
///
/// Unknown email and wrong password get the same 401 so the endpoint
/// does not leak which addresses have accounts.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let email = payload.email.trim().to_lowercase();

    let user = match state.db.get_user_by_email(&email).await? {
        Some(user) => user,
        None => return Err(AppError::Unauthorized),
    };

    let password_ok = bcrypt::verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password verification failed: {}", e)))?;
    if !password_ok {
        return Err(AppError::Unauthorized);
    }

    let jwt = create_session_jwt(&user.id, user.role, &state.config.jwt_signing_key)?;

    tracing::info!(user_id = %user.id, "User logged in");

    let cookie = session_cookie(jwt.clone(), &state.config.frontend_url);
    Ok((
        jar.add(cookie),
        Json(SessionResponse {
            message: "Login successful".to_string(),
            token: jwt,
            user: UserProfile::from_user(&user),
        }),
    ))
}

/// Clear the session cookie. The JWT itself stays valid until expiry;
/// logout only removes it from the browser.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (StatusCode, CookieJar) {
    (
        StatusCode::NO_CONTENT,
        jar.add(removal_cookie(&state.config.frontend_url)),
    )
}

// ─── Current User ────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserProfile,
}

/// Get the authenticated user's profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MeResponse>> {
    let profile = state
        .db
        .get_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(MeResponse {
        user: UserProfile::from_user(&profile),
    }))
}
