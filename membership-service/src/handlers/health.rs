use crate::store::{Collection, DocRef};
use crate::AppState;
use axum::{extract::State, Json};
use platform_core::error::AppError;

/// Service health check.
///
/// Probes the document store with a cheap read so load balancers stop
/// routing to an instance that lost its backend.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .store
        .get(&DocRef::new(Collection::Users, "_health"))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Store health check failed");
            e
        })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": state.config.environment.as_str(),
        "checks": {
            "store": "up"
        }
    })))
}
