use crate::dtos::{ApiResponse, CacheClearRequest, CacheClearance};
use crate::middleware::CurrentUser;
use crate::utils::ValidatedJson;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use platform_core::error::AppError;

/// Report identity cache occupancy and configuration.
pub async fn cache_stats(
    State(state): State<AppState>,
    CurrentUser(_principal): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(ApiResponse::new(state.identity.cache_stats())))
}

/// Clear the identity cache, or a single entry when a key is supplied.
///
/// The body is optional: DELETE with no body clears everything.
pub async fn clear_cache(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    body: Option<ValidatedJson<CacheClearRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let key = body.and_then(|ValidatedJson(req)| req.key);

    let cleared = match key.as_deref() {
        Some(uid) => usize::from(state.identity.invalidate(uid)),
        None => state.identity.clear_cache(),
    };

    tracing::info!(
        actor = %principal.uid,
        key = key.as_deref().unwrap_or("*"),
        cleared,
        "Identity cache cleared"
    );

    Ok(Json(ApiResponse::with_message(
        CacheClearance { cleared },
        "Cache cleared",
    )))
}
