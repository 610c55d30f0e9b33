//! Gateway pipeline stages: authenticate, then policy. Rate limiting wraps
//! both from `platform_core::middleware::rate_limit`.

pub mod auth;
pub mod policy;

pub use auth::{authenticate, CurrentUser, RESPONSE_TIME_HEADER};
pub use policy::{enforce, Gate};
