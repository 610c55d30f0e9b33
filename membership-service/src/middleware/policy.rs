//! Policy stage of the gateway pipeline.
//!
//! Each route group declares a [`Gate`]; the middleware checks the
//! authenticated principal against it after the authentication stage has
//! run. Admin roles implicitly satisfy the club-staff requirement.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use platform_core::error::AppError;

use crate::models::Principal;

/// Declared requirements for a route group.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    admin_only: bool,
    club_staff_only: bool,
    club: Option<String>,
}

impl Gate {
    pub fn admin() -> Self {
        Gate {
            admin_only: true,
            ..Gate::default()
        }
    }

    pub fn club_staff() -> Self {
        Gate {
            club_staff_only: true,
            ..Gate::default()
        }
    }

    /// Additionally require membership of one specific club.
    pub fn with_club(mut self, club_id: impl Into<String>) -> Self {
        self.club = Some(club_id.into());
        self
    }

    pub fn check(&self, principal: &Principal) -> Result<(), AppError> {
        if self.admin_only && !principal.role.is_admin() {
            return Err(AppError::InsufficientPermissions(anyhow::anyhow!(
                "Admin access required"
            )));
        }

        if self.club_staff_only
            && !(principal.role.is_admin() || principal.role.is_club_staff())
        {
            return Err(AppError::InsufficientPermissions(anyhow::anyhow!(
                "Club staff access required"
            )));
        }

        if let Some(club_id) = &self.club {
            if !principal.belongs_to_club(club_id) {
                return Err(AppError::Forbidden(anyhow::anyhow!(
                    "Access denied to this club"
                )));
            }
        }

        Ok(())
    }
}

pub async fn enforce(
    State(gate): State<Gate>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = req.extensions().get::<Principal>().ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!("principal missing from request extensions"))
    })?;

    if let Err(err) = gate.check(principal) {
        tracing::warn!(
            uid = %principal.uid,
            role = %principal.role,
            path = req.uri().path(),
            error = %err,
            "policy rejected"
        );
        return Err(err);
    }

    Ok(next.run(req).await)
}
