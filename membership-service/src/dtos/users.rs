use serde::Deserialize;
use validator::Validate;

use crate::models::UserStatus;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,

    pub status: UserStatus,

    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LinkMemberRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,

    #[validate(length(min = 1, message = "memberId is required"))]
    pub member_id: String,

    /// Clear stale links on either side instead of conflicting.
    #[serde(default)]
    pub force_update: bool,
}
