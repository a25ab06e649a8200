// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation security tests.
//!
//! All of these run against the offline mock database. Validation
//! happens before any Firestore access, so the expected responses are
//! deterministic 400s even without the emulator.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

/// Read the error envelope out of a response body.
async fn error_details(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn valid_submission() -> Value {
    json!({
        "type": "recycling",
        "title": "Recycled plastic bottles",
        "description": "Two bags dropped at the collection center",
        "quantity": 2,
        "unit": "bags",
        "verificationMedia": [
            {"type": "image", "url": "https://cdn.example.com/proof.jpg", "filename": "proof.jpg"}
        ],
        "location": {
            "latitude": 12.9716,
            "longitude": 77.5946,
            "accuracy": 8.0,
            "address": "Cubbon Park, Bengaluru",
            "capturedAt": "2024-06-01T09:55:00Z"
        }
    })
}

#[tokio::test]
async fn test_submission_missing_required_fields() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json("/activities", &token, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["error"], "bad_request");
    assert_eq!(body["details"], "Type, title, and description are required");
}

#[tokio::test]
async fn test_submission_unknown_activity_type() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let mut body = valid_submission();
    body["type"] = json!("jogging");

    let response = app
        .oneshot(post_json("/activities", &token, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "Invalid activity type");
}

#[tokio::test]
async fn test_submission_rejects_zero_quantity() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let mut body = valid_submission();
    body["quantity"] = json!(0);

    let response = app
        .oneshot(post_json("/activities", &token, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "Quantity must be at least 1");
}

#[tokio::test]
async fn test_submission_requires_verification_media() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let mut body = valid_submission();
    body["verificationMedia"] = json!([]);

    let response = app
        .oneshot(post_json("/activities", &token, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(
        body["details"],
        "At least one photo or video is required for verification"
    );
}

#[tokio::test]
async fn test_submission_limits_verification_media() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let file =
        json!({"type": "image", "url": "https://cdn.example.com/p.jpg", "filename": "p.jpg"});
    let mut body = valid_submission();
    body["verificationMedia"] = Value::Array(vec![file.clone(), file.clone(), file.clone(), file]);

    let response = app
        .oneshot(post_json("/activities", &token, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "Maximum 3 files allowed for verification");
}

#[tokio::test]
async fn test_submission_requires_location() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let mut body = valid_submission();
    body.as_object_mut().unwrap().remove("location");

    let response = app
        .oneshot(post_json("/activities", &token, body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(
        body["details"],
        "Complete location data is required for verification"
    );
}

#[tokio::test]
async fn test_activity_list_rejects_unknown_status() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/activities?status=archived")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "Invalid status filter");
}

#[tokio::test]
async fn test_activity_list_rejects_unknown_type() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/activities?type=jogging")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Asha",
                        "email": "not-an-email",
                        "password": "hunter22"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "A valid email address is required");
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "Asha",
                        "email": "asha@example.com",
                        "password": "short"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "Password must be at least 6 characters");
}

#[tokio::test]
async fn test_register_rejects_blank_name() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "name": "   ",
                        "email": "asha@example.com",
                        "password": "hunter22"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "Name is required");
}

#[tokio::test]
async fn test_reject_requires_reason() {
    let (app, state) = common::create_test_app();
    let token = common::create_admin_jwt("admin-1", &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json(
            "/admin/activities/act-1/reject",
            &token,
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "Rejection reason is required");
}

#[tokio::test]
async fn test_reject_reason_length_capped() {
    let (app, state) = common::create_test_app();
    let token = common::create_admin_jwt("admin-1", &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json(
            "/admin/activities/act-1/reject",
            &token,
            json!({"reason": "x".repeat(501)}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(
        body["details"],
        "Rejection reason must be 500 characters or fewer"
    );
}

#[tokio::test]
async fn test_redeem_requires_reward_id() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json("/rewards/redeem", &token, json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "Reward ID is required");
}

#[tokio::test]
async fn test_rewards_list_rejects_unknown_category() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/rewards?category=weapons")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "Invalid reward category");
}

#[tokio::test]
async fn test_voucher_list_rejects_unknown_status() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt("user-12345", &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/user/vouchers?status=lost")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = error_details(response).await;
    assert_eq!(body["details"], "Invalid voucher status");
}
