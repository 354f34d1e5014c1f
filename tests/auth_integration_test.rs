//! Registration, login, token lifecycle and account management over HTTP.

mod common;

use axum::http::StatusCode;
use common::{TestApp, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn register_returns_token_and_customer_profile() {
    let app = TestApp::new().await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({"name": "Aline", "email": "  Aline@Example.COM ", "password": PASSWORD}),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["expires_in"].as_u64().unwrap() > 0);
    assert_eq!(body["user"]["email"], "aline@example.com");
    assert_eq!(body["user"]["role"], "CUSTOMER");
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = TestApp::new().await;
    app.register_customer("dup@example.com").await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            json!({"name": "Again", "email": "DUP@example.com", "password": PASSWORD}),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email is already registered");
}

#[tokio::test]
async fn invalid_registrations_are_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app
        .post(
            "/api/auth/register",
            json!({"name": "Short", "email": "short@example.com", "password": "12345"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/auth/register",
            json!({"name": "Bad", "email": "not-an-email", "password": PASSWORD}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/auth/register",
            json!({"name": "Root", "email": "root@example.com", "password": PASSWORD, "role": "ADMIN"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/auth/register",
            json!({"name": "Shop", "email": "shop@example.com", "password": PASSWORD, "role": "VENDOR"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "vendors need a business name");
}

#[tokio::test]
async fn vendor_registration_opens_pending_profile() {
    let app = TestApp::new().await;
    let vendor = app.register_vendor("seller@example.com", "Kigali Crafts").await;
    assert!(vendor.vendor_id.is_some());

    let (status, body) = app.get("/api/vendors/me", Some(&vendor.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["business_name"], "Kigali Crafts");
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["is_verified"], false);
}

#[tokio::test]
async fn login_accepts_right_password_only() {
    let app = TestApp::new().await;
    app.register_customer("login@example.com").await;

    let session = app.login("LOGIN@example.com", PASSWORD).await;
    assert_eq!(session.email, "login@example.com");

    let (wrong_password, wrong_body) = app
        .post(
            "/api/auth/login",
            json!({"email": "login@example.com", "password": "nope-nope"}),
            None,
        )
        .await;
    let (unknown, unknown_body) = app
        .post(
            "/api/auth/login",
            json!({"email": "ghost@example.com", "password": PASSWORD}),
            None,
        )
        .await;

    assert_eq!(wrong_password, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body["message"], unknown_body["message"]);
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = TestApp::new().await;

    let (status, _) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/auth/me", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let customer = app.register_customer("me@example.com").await;
    let (status, body) = app.get("/api/auth/me", Some(&customer.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], customer.user_id.to_string());
}

#[tokio::test]
async fn logout_revokes_the_presented_token() {
    let app = TestApp::new().await;
    let customer = app.register_customer("bye@example.com").await;

    let (status, body) = app
        .post("/api/auth/logout", json!({}), Some(&customer.token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out");

    let (status, _) = app.get("/api/auth/me", Some(&customer.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let fresh = app.login("bye@example.com", PASSWORD).await;
    let (status, _) = app.get("/api/auth/me", Some(&fresh.token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn profile_and_password_updates() {
    let app = TestApp::new().await;
    let customer = app.register_customer("edit@example.com").await;

    let (status, body) = app
        .put(
            "/api/auth/me",
            json!({"name": "Edited Name", "phone": "+250788123456"}),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Edited Name");
    assert_eq!(body["phone"], "+250788123456");

    let (status, _) = app
        .post(
            "/api/auth/change-password",
            json!({"current_password": "wrong-one", "new_password": "brand-new-pass"}),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post(
            "/api/auth/change-password",
            json!({"current_password": PASSWORD, "new_password": "brand-new-pass"}),
            Some(&customer.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    app.login("edit@example.com", "brand-new-pass").await;
    let (status, _) = app
        .post(
            "/api/auth/login",
            json!({"email": "edit@example.com", "password": PASSWORD}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_accounts_cannot_log_in() {
    let app = TestApp::new().await;
    let admin = app.admin().await;
    let customer = app.register_customer("inactive@example.com").await;

    let (status, body) = app
        .put(
            &format!("/api/admin/users/{}/status", customer.user_id),
            json!({"is_active": false}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, _) = app
        .post(
            "/api/auth/login",
            json!({"email": "inactive@example.com", "password": PASSWORD}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Tokens issued before deactivation stop working too
    let (status, _) = app.get("/api/auth/me", Some(&customer.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/orders", Some(&customer.token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .put(
            &format!("/api/admin/users/{}/status", customer.user_id),
            json!({"is_active": true}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let again = app.login("inactive@example.com", PASSWORD).await;
    let (status, _) = app.get("/api/auth/me", Some(&again.token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .put(
            &format!("/api/admin/users/{}/status", admin.user_id),
            json!({"is_active": false}),
            Some(&admin.token),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn errors_use_the_common_json_shape() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/definitely-not-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");

    let response = app
        .request(
            axum::http::Method::POST,
            "/api/auth/login",
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::response_json(response).await;
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn malformed_ids_are_json_bad_requests() {
    let app = TestApp::new().await;
    let customer = app.register_customer("typo@example.com").await;

    let response = app
        .request(
            axum::http::Method::GET,
            "/api/orders/not-a-uuid",
            None,
            Some(&customer.token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let content_type = response
        .headers()
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("application/json"), "{content_type}");
    let body = common::response_json(response).await;
    assert_eq!(body["message"], "Invalid path parameter");

    let (status, body) = app.get("/api/vendors/12345", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}
