use membership_service::{
    build_router,
    config::MembershipConfig,
    services::{AccountService, ApprovalService, IdentityService, JwtVerifier},
    store::MemoryStore,
    AppState,
};
use platform_core::middleware::rate_limit::create_fixed_window_limiter;
use platform_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), platform_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = MembershipConfig::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = config.environment.as_str(),
        "Starting membership service"
    );

    // Initialize the document store
    let store: Arc<dyn membership_service::store::DocumentStore> = Arc::new(MemoryStore::new());
    tracing::info!("Document store initialized");

    // Initialize the token verifier
    let verifier = JwtVerifier::new(&config.jwt.public_key_path)?;
    let verifier: Arc<dyn membership_service::services::TokenVerifier> = Arc::new(verifier);

    // Initialize rate limiters
    let standard_limiter = create_fixed_window_limiter(
        config.rate_limit.standard_limit,
        config.rate_limit.standard_window_seconds,
    );
    let strict_limiter = create_fixed_window_limiter(
        config.rate_limit.strict_limit,
        config.rate_limit.strict_window_seconds,
    );
    tracing::info!("Rate limiters initialized: Standard and Strict");

    // Initialize services
    let identity = IdentityService::new(
        store.clone(),
        Duration::from_secs(config.cache.identity_ttl_seconds),
    );
    let approvals = ApprovalService::new(store.clone(), identity.clone());
    let accounts = AccountService::new(store.clone(), identity.clone());
    tracing::info!("Services initialized");

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        verifier,
        identity: identity.clone(),
        approvals,
        accounts,
        standard_limiter: standard_limiter.clone(),
        strict_limiter: strict_limiter.clone(),
    };

    // Periodic sweep of expired cache entries and idle limiter buckets
    let sweep_interval = Duration::from_secs(config.cache.sweep_interval_seconds);
    let standard_idle = Duration::from_secs(config.rate_limit.standard_window_seconds);
    let strict_idle = Duration::from_secs(config.rate_limit.strict_window_seconds);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let cache_evicted = identity.purge_expired();
            let buckets_evicted = standard_limiter.purge_idle(standard_idle)
                + strict_limiter.purge_idle(strict_idle);
            tracing::debug!(cache_evicted, buckets_evicted, "Sweep completed");
        }
    });

    // Build application router
    let app = build_router(state).await?;

    // Start server
    let addr = config.common.bind_addr()?;

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = config.environment.as_str(),
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
