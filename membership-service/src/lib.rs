pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use platform_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{rate_limit_middleware, SharedLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::MembershipConfig;
use crate::middleware::Gate;
use crate::services::{AccountService, ApprovalService, IdentityService, TokenVerifier};
use crate::store::DocumentStore;
use platform_core::error::AppError;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MembershipConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub identity: IdentityService,
    pub approvals: ApprovalService,
    pub accounts: AccountService,
    pub standard_limiter: SharedLimiter,
    pub strict_limiter: SharedLimiter,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Club staff workflow routes. Layers run rate-limit, then authenticate,
    // then the policy gate; the handler only sees requests that passed all
    // three.
    let staff_routes = Router::new()
        .route(
            "/admin/approvals/member",
            post(handlers::approvals::approve_member),
        )
        .route(
            "/admin/approvals/family",
            post(handlers::approvals::approve_family),
        )
        .route(
            "/admin/approvals/reject",
            post(handlers::approvals::reject_registration),
        )
        .route("/admin/passes/approve", post(handlers::passes::approve_pass))
        .route("/admin/passes/reject", post(handlers::passes::reject_pass))
        .route("/admin/passes/cancel", post(handlers::passes::cancel_pass))
        .route(
            "/admin/users/link-member",
            post(handlers::users::link_member),
        )
        .layer(from_fn_with_state(
            Gate::club_staff(),
            middleware::enforce,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .layer(from_fn_with_state(
            state.standard_limiter.clone(),
            rate_limit_middleware,
        ));

    // Status changes revoke access; they get the strict tier.
    let status_routes = Router::new()
        .route(
            "/admin/users/update-status",
            post(handlers::users::update_status),
        )
        .layer(from_fn_with_state(
            Gate::club_staff(),
            middleware::enforce,
        ))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .layer(from_fn_with_state(
            state.strict_limiter.clone(),
            rate_limit_middleware,
        ));

    // Cache administration, admin roles only.
    let cache_routes = Router::new()
        .route(
            "/admin/cache",
            get(handlers::admin::cache_stats).delete(handlers::admin::clear_cache),
        )
        .layer(from_fn_with_state(Gate::admin(), middleware::enforce))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .layer(from_fn_with_state(
            state.strict_limiter.clone(),
            rate_limit_middleware,
        ));

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(staff_routes)
        .merge(status_routes)
        .merge(cache_routes)
        .with_state(state.clone())
        // Add metrics middleware
        .layer(from_fn(metrics_middleware))
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
        // Add security headers middleware
        .layer(from_fn(security_headers_middleware))
        // Add CORS layer
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<HeaderValue>>(),
                )
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );

    Ok(app)
}
