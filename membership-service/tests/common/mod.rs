//! Test helper module for membership-service integration tests.
//!
//! Builds the full router over the in-memory store and drives it with
//! `tower::ServiceExt::oneshot`, so tests exercise the real middleware
//! stack without binding a port.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use membership_service::{
    build_router,
    config::{
        CacheConfig, Environment, JwtConfig, MembershipConfig, RateLimitConfig, SecurityConfig,
    },
    services::{
        AccountService, ApprovalService, IdentityService, StaticTokenVerifier, TokenVerifier,
    },
    store::{Collection, DocRef, DocumentStore, MemoryStore},
    AppState,
};
use platform_core::middleware::rate_limit::create_fixed_window_limiter;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

pub const TEST_CLUB: &str = "club-harbor";
pub const OTHER_CLUB: &str = "club-summit";

/// Test application routing requests straight into the router.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub verifier: Arc<StaticTokenVerifier>,
    pub state: AppState,
}

impl TestApp {
    /// Spawn with limits high enough that rate limiting never interferes.
    pub async fn spawn() -> Self {
        Self::spawn_with_limits(1000, 1000).await
    }

    /// Spawn with explicit standard/strict per-window limits.
    pub async fn spawn_with_limits(standard_limit: u32, strict_limit: u32) -> Self {
        let store = Arc::new(MemoryStore::new());
        let verifier = Arc::new(StaticTokenVerifier::new());
        let config = create_test_config(standard_limit, strict_limit);

        let identity = IdentityService::new(
            store.clone() as Arc<dyn DocumentStore>,
            Duration::from_secs(config.cache.identity_ttl_seconds),
        );
        let approvals = ApprovalService::new(store.clone() as Arc<dyn DocumentStore>, identity.clone());
        let accounts = AccountService::new(store.clone() as Arc<dyn DocumentStore>, identity.clone());

        let standard_limiter = create_fixed_window_limiter(
            config.rate_limit.standard_limit,
            config.rate_limit.standard_window_seconds,
        );
        let strict_limiter = create_fixed_window_limiter(
            config.rate_limit.strict_limit,
            config.rate_limit.strict_window_seconds,
        );

        let state = AppState {
            config: Arc::new(config),
            store: store.clone() as Arc<dyn DocumentStore>,
            verifier: verifier.clone() as Arc<dyn TokenVerifier>,
            identity,
            approvals,
            accounts,
            standard_limiter,
            strict_limiter,
        };

        let router = build_router(state.clone())
            .await
            .expect("Failed to build router");

        TestApp {
            router,
            store,
            verifier,
            state,
        }
    }

    /// Register a bearer token for `uid` and return it.
    pub fn token_for(&self, uid: &str) -> String {
        let token = format!("tok-{}", uid);
        self.verifier
            .register(token.clone(), uid, format!("{}@example.com", uid));
        token
    }

    /// Seed a user document and return a token that authenticates as them.
    pub fn login_as(&self, uid: &str, role: &str, status: &str, club: Option<&str>) -> String {
        self.seed_user(uid, role, status, club);
        self.token_for(uid)
    }

    pub fn seed_user(&self, uid: &str, role: &str, status: &str, club: Option<&str>) {
        let mut doc = json!({
            "email": format!("{}@example.com", uid),
            "role": role,
            "status": status,
        });
        if let Some(club) = club {
            doc["clubId"] = json!(club);
            doc["clubName"] = json!("Harbor FC");
        }
        self.store.seed(DocRef::new(Collection::Users, uid), doc);
    }

    pub fn seed_member_request(&self, id: &str, club: &str, requested_by: &str) {
        self.store.seed(
            DocRef::new(Collection::MemberRegistrationRequests, id),
            json!({
                "status": "pending",
                "clubId": club,
                "clubName": "Harbor FC",
                "name": "Jamie Example",
                "dateOfBirth": "1990-04-01",
                "requestedBy": requested_by,
            }),
        );
    }

    pub fn seed_family_request(&self, id: &str, club: &str, requested_by: &str) {
        self.store.seed(
            DocRef::new(Collection::FamilyRegistrationRequests, id),
            json!({
                "status": "pending",
                "clubId": club,
                "clubName": "Harbor FC",
                "parents": [
                    { "name": "Dana Example", "phoneNumber": "555-0100" },
                ],
                "children": [
                    { "name": "Alex Example", "dateOfBirth": "2015-09-12" },
                ],
                "guardianRelation": "parent",
                "requestedBy": requested_by,
            }),
        );
    }

    pub fn seed_pass_template(&self, id: &str, kind: &str, club: &str) {
        self.store.seed(
            DocRef::new(Collection::PassTemplates, id),
            json!({
                "name": "Standard Training",
                "type": kind,
                "price": 4500,
                "clubId": club,
            }),
        );
    }

    pub fn seed_member(&self, id: &str, club: &str) {
        self.store.seed(
            DocRef::new(Collection::Members, id),
            json!({
                "name": "Jamie Example",
                "clubId": club,
                "clubName": "Harbor FC",
                "memberCategory": "adult",
                "status": "active",
                "createdAt": "2024-01-01T00:00:00Z",
                "approvedBy": "staff-0",
                "approvedAt": "2024-01-01T00:00:00Z",
            }),
        );
    }

    pub fn seed_pass_request(&self, id: &str, club: &str, template_id: &str, member_id: &str) {
        self.store.seed(
            DocRef::new(Collection::PassRequests, id),
            json!({
                "status": "pending",
                "clubId": club,
                "templateId": template_id,
                "memberId": member_id,
                "memberName": "Jamie Example",
                "type": "new",
                "requestedBy": "u-requester",
            }),
        );
    }

    pub fn seed_active_pass(&self, id: &str, club: &str, member_id: &str) {
        self.store.seed(
            DocRef::new(Collection::MemberPasses, id),
            json!({
                "templateId": "tpl-1",
                "templateName": "Standard Training",
                "memberId": member_id,
                "memberName": "Jamie Example",
                "clubId": club,
                "type": "monthly",
                "startDate": "2024-01-01T00:00:00Z",
                "endDate": "2024-02-01T00:00:00Z",
                "price": 4500,
                "paymentStatus": "pending",
                "status": "active",
                "usageCount": 0,
                "createdAt": "2024-01-01T00:00:00Z",
                "approvedBy": "staff-0",
                "approvedAt": "2024-01-01T00:00:00Z",
            }),
        );
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::empty()).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn delete(&self, path: &str, token: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method("DELETE").uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn document(&self, collection: Collection, id: &str) -> Option<Value> {
        self.store.document(&DocRef::new(collection, id))
    }
}

/// Create a test configuration with the given rate limits.
pub fn create_test_config(standard_limit: u32, strict_limit: u32) -> MembershipConfig {
    MembershipConfig {
        common: platform_core::config::Config {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        environment: Environment::Dev,
        service_name: "membership-service-test".to_string(),
        service_version: "0.1.0".to_string(),
        log_level: "error".to_string(),
        jwt: JwtConfig {
            public_key_path: "unused-in-tests.pem".to_string(),
        },
        cache: CacheConfig {
            identity_ttl_seconds: 300,
            sweep_interval_seconds: 300,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            standard_limit,
            standard_window_seconds: 60,
            strict_limit,
            strict_window_seconds: 60,
        },
    }
}

/// Read and parse a JSON response body.
pub async fn read_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
