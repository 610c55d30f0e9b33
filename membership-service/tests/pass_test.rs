mod common;

use axum::http::StatusCode;
use common::{read_json, TestApp, TEST_CLUB};
use membership_service::store::{Collection, DocRef};
use serde_json::json;

#[tokio::test]
async fn approving_a_monthly_pass_issues_it_and_links_the_member() {
    let app = TestApp::spawn().await;
    let token = app.login_as("staff-1", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    app.seed_pass_template("tpl-1", "monthly", TEST_CLUB);
    app.seed_member("m-1", TEST_CLUB);
    app.store.seed(
        DocRef::new(Collection::PassRequests, "pr-1"),
        json!({
            "status": "pending",
            "clubId": TEST_CLUB,
            "templateId": "tpl-1",
            "memberId": "m-1",
            "memberName": "Jamie Example",
            "type": "new",
            "requestedStartDate": "2024-01-15T00:00:00Z",
            "requestedBy": "u-requester",
        }),
    );

    let response = app
        .post(
            "/admin/passes/approve",
            Some(&token),
            json!({"requestId": "pr-1"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["message"], "Pass approved");
    assert_eq!(body["data"]["memberId"], "m-1");
    let pass_id = body["data"]["passId"].as_str().unwrap().to_string();

    // Calendar-month period from the requested start date.
    let pass = app.document(Collection::MemberPasses, &pass_id).unwrap();
    assert_eq!(pass["type"], "monthly");
    assert_eq!(pass["startDate"], "2024-01-15T00:00:00Z");
    assert_eq!(pass["endDate"], "2024-02-15T00:00:00Z");
    assert_eq!(pass["status"], "active");
    assert_eq!(pass["paymentStatus"], "pending");
    assert_eq!(pass["price"], 4500);
    assert_eq!(pass["usageCount"], 0);
    assert_eq!(pass["approvedBy"], "staff-1");
    assert!(pass.get("remainingSessions").is_none());

    let member = app.document(Collection::Members, "m-1").unwrap();
    assert_eq!(member["activePassId"], pass_id.as_str());

    let request = app.document(Collection::PassRequests, "pr-1").unwrap();
    assert_eq!(request["status"], "approved");
    assert_eq!(request["createdPassId"], pass_id.as_str());

    assert_eq!(app.store.count(Collection::AuditLogs), 1);
}

#[tokio::test]
async fn session_based_passes_carry_a_session_budget() {
    let app = TestApp::spawn().await;
    let token = app.login_as("staff-1", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    app.store.seed(
        DocRef::new(Collection::PassTemplates, "tpl-s"),
        json!({
            "name": "Ten Sessions",
            "type": "session-based",
            "sessionCount": 12,
            "price": 9000,
            "clubId": TEST_CLUB,
        }),
    );
    app.seed_member("m-1", TEST_CLUB);
    app.store.seed(
        DocRef::new(Collection::PassRequests, "pr-1"),
        json!({
            "status": "pending",
            "clubId": TEST_CLUB,
            "templateId": "tpl-s",
            "memberId": "m-1",
            "memberName": "Jamie Example",
            "requestedStartDate": "2024-03-01T00:00:00Z",
            "requestedBy": "u-requester",
        }),
    );

    let response = app
        .post(
            "/admin/passes/approve",
            Some(&token),
            json!({"requestId": "pr-1"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let pass_id = body["data"]["passId"].as_str().unwrap().to_string();
    let pass = app.document(Collection::MemberPasses, &pass_id).unwrap();

    assert_eq!(pass["remainingSessions"], 12);
    // The session budget governs usage; the period is the 30-day default.
    assert_eq!(pass["endDate"], "2024-03-31T00:00:00Z");
}

#[tokio::test]
async fn session_count_defaults_when_the_template_omits_it() {
    let app = TestApp::spawn().await;
    let token = app.login_as("staff-1", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    app.seed_pass_template("tpl-s", "session-based", TEST_CLUB);
    app.seed_member("m-1", TEST_CLUB);
    app.seed_pass_request("pr-1", TEST_CLUB, "tpl-s", "m-1");

    let response = app
        .post(
            "/admin/passes/approve",
            Some(&token),
            json!({"requestId": "pr-1"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let pass_id = body["data"]["passId"].as_str().unwrap().to_string();
    let pass = app.document(Collection::MemberPasses, &pass_id).unwrap();
    assert_eq!(pass["remainingSessions"], 10);
}

#[tokio::test]
async fn renewal_expires_the_superseded_pass() {
    let app = TestApp::spawn().await;
    let token = app.login_as("staff-1", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    app.seed_pass_template("tpl-1", "monthly", TEST_CLUB);
    app.seed_member("m-1", TEST_CLUB);
    app.seed_active_pass("old-pass", TEST_CLUB, "m-1");
    app.store.seed(
        DocRef::new(Collection::PassRequests, "pr-1"),
        json!({
            "status": "pending",
            "clubId": TEST_CLUB,
            "templateId": "tpl-1",
            "memberId": "m-1",
            "memberName": "Jamie Example",
            "type": "renewal",
            "currentPassId": "old-pass",
            "requestedBy": "u-requester",
        }),
    );

    let response = app
        .post(
            "/admin/passes/approve",
            Some(&token),
            json!({"requestId": "pr-1"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let new_pass_id = body["data"]["passId"].as_str().unwrap().to_string();

    let old = app.document(Collection::MemberPasses, "old-pass").unwrap();
    assert_eq!(old["status"], "expired");
    assert!(old["expiredAt"].is_string());

    let member = app.document(Collection::Members, "m-1").unwrap();
    assert_eq!(member["activePassId"], new_pass_id.as_str());
}

#[tokio::test]
async fn missing_template_discards_the_whole_transaction() {
    let app = TestApp::spawn().await;
    let token = app.login_as("staff-1", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    app.seed_member("m-1", TEST_CLUB);
    app.seed_pass_request("pr-1", TEST_CLUB, "tpl-missing", "m-1");

    let response = app
        .post(
            "/admin/passes/approve",
            Some(&token),
            json!({"requestId": "pr-1"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = read_json(response).await;
    assert_eq!(body["error"]["message"], "Pass template not found");

    // Request untouched, nothing created.
    let request = app.document(Collection::PassRequests, "pr-1").unwrap();
    assert_eq!(request["status"], "pending");
    assert_eq!(app.store.count(Collection::MemberPasses), 0);
    assert_eq!(app.store.count(Collection::AuditLogs), 0);
}

#[tokio::test]
async fn rejecting_a_pass_request_leaves_no_pass_behind() {
    let app = TestApp::spawn().await;
    let token = app.login_as("staff-1", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    app.seed_pass_template("tpl-1", "monthly", TEST_CLUB);
    app.seed_member("m-1", TEST_CLUB);
    app.seed_pass_request("pr-1", TEST_CLUB, "tpl-1", "m-1");

    let response = app
        .post(
            "/admin/passes/reject",
            Some(&token),
            json!({"requestId": "pr-1", "reason": "Unpaid balance"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["message"], "Pass request rejected");

    let request = app.document(Collection::PassRequests, "pr-1").unwrap();
    assert_eq!(request["status"], "rejected");
    assert_eq!(request["rejectionReason"], "Unpaid balance");

    assert_eq!(app.store.count(Collection::MemberPasses), 0);
    assert_eq!(app.store.count(Collection::AuditLogs), 1);
}

#[tokio::test]
async fn cancelling_a_pass_detaches_it_from_the_member() {
    let app = TestApp::spawn().await;
    let token = app.login_as("staff-1", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    app.seed_active_pass("pass-1", TEST_CLUB, "m-1");
    app.store.seed(
        DocRef::new(Collection::Members, "m-1"),
        json!({
            "name": "Jamie Example",
            "clubId": TEST_CLUB,
            "memberCategory": "adult",
            "status": "active",
            "activePassId": "pass-1",
            "createdAt": "2024-01-01T00:00:00Z",
            "approvedBy": "staff-0",
            "approvedAt": "2024-01-01T00:00:00Z",
        }),
    );

    let response = app
        .post(
            "/admin/passes/cancel",
            Some(&token),
            json!({"passId": "pass-1", "reason": "Requested refund"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["message"], "Pass cancelled");
    assert_eq!(body["data"]["memberId"], "m-1");

    let pass = app.document(Collection::MemberPasses, "pass-1").unwrap();
    assert_eq!(pass["status"], "cancelled");
    assert_eq!(pass["cancelledBy"], "staff-1");
    assert_eq!(pass["cancellationReason"], "Requested refund");

    let member = app.document(Collection::Members, "m-1").unwrap();
    assert!(member["activePassId"].is_null());

    assert_eq!(app.store.count(Collection::AuditLogs), 1);
}

#[tokio::test]
async fn cancelling_twice_is_a_conflict() {
    let app = TestApp::spawn().await;
    let token = app.login_as("staff-1", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    app.seed_active_pass("pass-1", TEST_CLUB, "m-1");
    app.seed_member("m-1", TEST_CLUB);

    let first = app
        .post(
            "/admin/passes/cancel",
            Some(&token),
            json!({"passId": "pass-1", "reason": "duplicate"}),
        )
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .post(
            "/admin/passes/cancel",
            Some(&token),
            json!({"passId": "pass-1", "reason": "duplicate"}),
        )
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let body = read_json(second).await;
    assert_eq!(body["error"]["message"], "Pass already cancelled");
}

#[tokio::test]
async fn cancellation_requires_a_reason() {
    let app = TestApp::spawn().await;
    let token = app.login_as("staff-1", "CLUB_MANAGER", "active", Some(TEST_CLUB));
    app.seed_active_pass("pass-1", TEST_CLUB, "m-1");

    let response = app
        .post(
            "/admin/passes/cancel",
            Some(&token),
            json!({"passId": "pass-1", "reason": ""}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
