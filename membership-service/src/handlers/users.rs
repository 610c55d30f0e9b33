use crate::dtos::{ApiResponse, LinkMemberRequest, UpdateStatusRequest};
use crate::middleware::CurrentUser;
use crate::utils::ValidatedJson;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use platform_core::error::AppError;

/// Change a user's account status, with transition and scope checks.
pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(req): ValidatedJson<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .accounts
        .update_status(&req.user_id, req.status, req.reason.as_deref(), &principal)
        .await?;

    Ok(Json(ApiResponse::with_message(
        outcome,
        "User status updated",
    )))
}

/// Link a user account to a member record.
pub async fn link_member(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(req): ValidatedJson<LinkMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .accounts
        .link_member(&req.user_id, &req.member_id, req.force_update, &principal)
        .await?;

    Ok(Json(ApiResponse::with_message(
        outcome,
        "User linked to member",
    )))
}
