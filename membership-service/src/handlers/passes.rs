use crate::dtos::{ApiResponse, ApprovalActionRequest, CancelPassRequest, RejectPassRequest};
use crate::middleware::CurrentUser;
use crate::utils::ValidatedJson;
use crate::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use platform_core::error::AppError;

/// Approve a pass request, issuing the pass and attaching it to the member.
pub async fn approve_pass(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(req): ValidatedJson<ApprovalActionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .approvals
        .approve_pass(&req.request_id, &principal)
        .await?;

    Ok(Json(ApiResponse::with_message(outcome, "Pass approved")))
}

/// Reject a pass request.
pub async fn reject_pass(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(req): ValidatedJson<RejectPassRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .approvals
        .reject_pass(&req.request_id, req.reason.as_deref(), &principal)
        .await?;

    Ok(Json(ApiResponse::with_message(
        outcome,
        "Pass request rejected",
    )))
}

/// Cancel an active pass.
pub async fn cancel_pass(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(req): ValidatedJson<CancelPassRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .approvals
        .cancel_pass(&req.pass_id, &req.reason, &principal)
        .await?;

    Ok(Json(ApiResponse::with_message(outcome, "Pass cancelled")))
}
