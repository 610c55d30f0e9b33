mod common;

use axum::http::StatusCode;
use common::{read_json, TestApp, TEST_CLUB};
use serde_json::json;

#[tokio::test]
async fn health_endpoint_requires_no_token() {
    let app = TestApp::spawn().await;

    let response = app.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "membership-service-test");
    assert_eq!(body["checks"]["store"], "up");
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/admin/approvals/member", None, json!({"requestId": "r1"}))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(body["error"]["statusCode"], 401);
}

#[tokio::test]
async fn unverifiable_token_is_rejected_as_invalid() {
    let app = TestApp::spawn().await;

    let response = app
        .post(
            "/admin/approvals/member",
            Some("not-a-registered-token"),
            json!({"requestId": "r1"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn verified_token_without_user_record_is_not_found() {
    let app = TestApp::spawn().await;
    let token = app.token_for("u-ghost");

    let response = app
        .post(
            "/admin/approvals/member",
            Some(&token),
            json!({"requestId": "r1"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "User not found");
}

#[tokio::test]
async fn inactive_account_is_forbidden() {
    let app = TestApp::spawn().await;
    let token = app.login_as("u-gone", "CLUB_MANAGER", "inactive", Some(TEST_CLUB));

    let response = app
        .post(
            "/admin/approvals/member",
            Some(&token),
            json!({"requestId": "r1"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    assert_eq!(body["error"]["message"], "User account is inactive");
}

#[tokio::test]
async fn pending_account_passes_authentication() {
    let app = TestApp::spawn().await;
    let token = app.login_as("u-new", "CLUB_MANAGER", "pending", Some(TEST_CLUB));

    // 404 from the workflow proves the gateway admitted the request.
    let response = app
        .post(
            "/admin/approvals/member",
            Some(&token),
            json!({"requestId": "no-such-request"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = read_json(response).await;
    assert_eq!(body["error"]["message"], "Registration request not found");
}

#[tokio::test]
async fn plain_members_lack_staff_permissions() {
    let app = TestApp::spawn().await;
    let token = app.login_as("u-member", "MEMBER", "active", Some(TEST_CLUB));

    let response = app
        .post(
            "/admin/approvals/member",
            Some(&token),
            json!({"requestId": "r1"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
    assert_eq!(body["error"]["message"], "Club staff access required");
}

#[tokio::test]
async fn cache_endpoints_are_admin_only() {
    let app = TestApp::spawn().await;
    let staff = app.login_as("u-staff", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    let admin = app.login_as("u-admin", "FEDERATION_ADMIN", "active", None);

    let response = app.get("/admin/cache", Some(&staff)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
    assert_eq!(body["error"]["message"], "Admin access required");

    let response = app.get("/admin/cache", Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["defaultTtlSeconds"], 300);
    assert!(body["data"]["entries"].as_u64().is_some());
}

#[tokio::test]
async fn responses_carry_timing_request_id_and_security_headers() {
    let app = TestApp::spawn().await;
    let token = app.login_as("u-staff", "CLUB_MANAGER", "active", Some(TEST_CLUB));

    let response = app
        .post(
            "/admin/approvals/member",
            Some(&token),
            json!({"requestId": "no-such-request"}),
        )
        .await;

    let timing = response
        .headers()
        .get("x-response-time")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(timing.ends_with("ms"), "got {}", timing);

    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response
            .headers()
            .get("x-content-type-options")
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
}

#[tokio::test]
async fn stale_identity_persists_until_cache_is_cleared() {
    let app = TestApp::spawn().await;
    let staff = app.login_as("u-staff", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    let admin = app.login_as("u-admin", "SUPER_ADMIN", "active", None);

    // Prime the cache with the staff identity.
    let response = app
        .post(
            "/admin/approvals/member",
            Some(&staff),
            json!({"requestId": "no-such-request"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Demote the user in the store; the cached snapshot still wins.
    app.seed_user("u-staff", "MEMBER", "active", Some(TEST_CLUB));
    let response = app
        .post(
            "/admin/approvals/member",
            Some(&staff),
            json!({"requestId": "no-such-request"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Clearing the single entry makes the demotion visible.
    let response = app
        .delete("/admin/cache", Some(&admin), Some(json!({"key": "u-staff"})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["cleared"], 1);

    let response = app
        .post(
            "/admin/approvals/member",
            Some(&staff),
            json!({"requestId": "no-such-request"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn clearing_without_a_body_empties_the_whole_cache() {
    let app = TestApp::spawn().await;
    let staff = app.login_as("u-staff", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    let admin = app.login_as("u-admin", "SUPER_ADMIN", "active", None);

    // Two requests prime two cache entries.
    app.post(
        "/admin/approvals/member",
        Some(&staff),
        json!({"requestId": "no-such-request"}),
    )
    .await;
    let response = app.get("/admin/cache", Some(&admin)).await;
    let body = read_json(response).await;
    assert_eq!(body["data"]["entries"], 2);

    let response = app.delete("/admin/cache", Some(&admin), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["data"]["cleared"], 2);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = TestApp::spawn().await;
    let token = app.login_as("u-staff", "CLUB_MANAGER", "active", Some(TEST_CLUB));

    let response = app
        .post("/admin/approvals/member", Some(&token), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn empty_request_id_fails_validation() {
    let app = TestApp::spawn().await;
    let token = app.login_as("u-staff", "CLUB_MANAGER", "active", Some(TEST_CLUB));

    let response = app
        .post(
            "/admin/approvals/member",
            Some(&token),
            json!({"requestId": ""}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]
        .as_str()
        .unwrap()
        .contains("requestId"));
}
