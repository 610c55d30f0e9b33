//! Request/response DTOs and the success envelope.

pub mod admin;
pub mod approvals;
pub mod users;

pub use admin::{CacheClearRequest, CacheClearance};
pub use approvals::{
    ApprovalActionRequest, CancelPassRequest, RejectPassRequest, RejectRegistrationRequest,
};
pub use users::{LinkMemberRequest, UpdateStatusRequest};

use serde::Serialize;

/// Success envelope for every 2xx response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
        }
    }
}
