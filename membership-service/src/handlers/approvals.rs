use crate::dtos::{ApiResponse, ApprovalActionRequest, RejectRegistrationRequest};
use crate::middleware::CurrentUser;
use crate::utils::ValidatedJson;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use platform_core::error::AppError;

/// Approve a member registration request.
pub async fn approve_member(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(req): ValidatedJson<ApprovalActionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .approvals
        .approve_member(&req.request_id, &principal)
        .await?;

    Ok(Json(ApiResponse::with_message(
        outcome,
        "Member registration approved",
    )))
}

/// Approve a family registration request.
pub async fn approve_family(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(req): ValidatedJson<ApprovalActionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .approvals
        .approve_family(&req.request_id, &principal)
        .await?;

    Ok(Json(ApiResponse::with_message(
        outcome,
        "Family registration approved",
    )))
}

/// Reject a member or family registration request.
pub async fn reject_registration(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(req): ValidatedJson<RejectRegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .approvals
        .reject_registration(req.kind, &req.request_id, req.reason.as_deref(), &principal)
        .await?;

    Ok(Json(ApiResponse::with_message(
        outcome,
        "Registration request rejected",
    )))
}
