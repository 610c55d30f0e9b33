//! Authentication stage of the gateway pipeline.
//!
//! Verifies the bearer token, resolves the subject's identity (cache first)
//! and attaches the resulting [`Principal`] to request extensions. Wraps the
//! rest of the request to time it and emit the per-request log event.

use std::time::Instant;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use platform_core::error::AppError;

use crate::models::{Principal, UserStatus};
use crate::AppState;

pub const RESPONSE_TIME_HEADER: &str = "x-response-time";

pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let (principal, cache_hit) = match resolve_principal(&state, req.headers()).await {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::warn!(
                method = %method,
                path = %path,
                error = %err,
                "authentication rejected"
            );
            return Err(err);
        }
    };

    let uid = principal.uid.clone();
    let role = principal.role;
    req.extensions_mut().insert(principal);

    let mut response = next.run(req).await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    if let Ok(value) = HeaderValue::from_str(&format!("{}ms", elapsed_ms)) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(RESPONSE_TIME_HEADER), value);
    }

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        tracing::warn!(
            uid = %uid,
            role = %role,
            cache_hit,
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms,
            "request failed"
        );
    } else {
        tracing::info!(
            uid = %uid,
            role = %role,
            cache_hit,
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms,
            "request completed"
        );
    }

    Ok(response)
}

/// Token verification plus identity resolution, in pipeline order. Each
/// failure is terminal and maps to its own taxonomy entry.
async fn resolve_principal(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<(Principal, bool), AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state
        .verifier
        .verify(token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "token verifier failure");
            AppError::InternalError(e)
        })?
        .ok_or_else(|| AppError::InvalidToken(anyhow::anyhow!("Invalid or expired token")))?;

    let (snapshot, cache_hit) = state
        .identity
        .resolve(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    // Pending accounts are admitted; the policy stage decides what they
    // may actually do.
    if !matches!(snapshot.status, UserStatus::Active | UserStatus::Pending) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "User account is inactive"
        )));
    }

    let principal = Principal {
        uid: claims.sub,
        email: claims.email,
        role: snapshot.role,
        status: snapshot.status,
        club_id: snapshot.club_id,
        club_name: snapshot.club_name,
    };

    Ok((principal, cache_hit))
}

/// Extractor handing the authenticated principal to handlers.
pub struct CurrentUser(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "principal missing from request extensions"
                ))
            })
    }
}
