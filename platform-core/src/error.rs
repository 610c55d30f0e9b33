use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Invalid token: {0}")]
    InvalidToken(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorEnvelope {
            success: bool,
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
            #[serde(rename = "statusCode")]
            status_code: u16,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (status, code, message, details, retry_after) = match self {
            AppError::ValidationError(err) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation error".to_string(),
                Some(err.to_string()),
                None,
            ),
            AppError::BadRequest(err) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                err.to_string(),
                None,
                None,
            ),
            AppError::NotFound(err) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                err.to_string(),
                None,
                None,
            ),
            AppError::Unauthorized(err) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                err.to_string(),
                None,
                None,
            ),
            AppError::InvalidToken(err) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_TOKEN",
                err.to_string(),
                None,
                None,
            ),
            AppError::Forbidden(err) => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                err.to_string(),
                None,
                None,
            ),
            AppError::InsufficientPermissions(err) => (
                StatusCode::FORBIDDEN,
                "INSUFFICIENT_PERMISSIONS",
                err.to_string(),
                None,
                None,
            ),
            AppError::Conflict(err) => (
                StatusCode::CONFLICT,
                "CONFLICT",
                err.to_string(),
                None,
                None,
            ),
            AppError::TooManyRequests(msg, retry) => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                msg,
                None,
                retry,
            ),
            AppError::InternalError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
                // Expose the cause in debug builds only
                cfg!(debug_assertions).then(|| err.to_string()),
                None,
            ),
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Configuration error".to_string(),
                cfg!(debug_assertions).then(|| err.to_string()),
                None,
            ),
        };

        let mut res = (
            status,
            Json(ErrorEnvelope {
                success: false,
                error: ErrorBody {
                    code,
                    message,
                    status_code: status.as_u16(),
                    details,
                },
            }),
        )
            .into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}
