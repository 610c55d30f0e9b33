use serde::Deserialize;
use validator::Validate;

use crate::services::RegistrationKind;

/// Body shared by the plain approve endpoints.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalActionRequest {
    #[validate(length(min = 1, message = "requestId is required"))]
    pub request_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectRegistrationRequest {
    #[validate(length(min = 1, message = "requestId is required"))]
    pub request_id: String,

    pub kind: RegistrationKind,

    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectPassRequest {
    #[validate(length(min = 1, message = "requestId is required"))]
    pub request_id: String,

    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CancelPassRequest {
    #[validate(length(min = 1, message = "passId is required"))]
    pub pass_id: String,

    #[validate(length(min = 1, message = "reason is required"))]
    pub reason: String,
}
