//! Account status transition rules.
//!
//! Pure decision logic over the pending/active/inactive lifecycle: no I/O,
//! no persistence. Callers persist the outcome and write the audit entry.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;

use crate::models::{AuditAction, AuditLogEntry, Principal, Role, UserRecord, UserStatus};

/// A login within this many days of a deactivation triggers an extra warning.
const RECENT_LOGIN_WINDOW_DAYS: i64 = 7;

/// Transitions a permitted actor may request. Same-status changes are
/// rejected before this table is consulted.
const ALLOWED_TRANSITIONS: [(UserStatus, UserStatus); 6] = [
    (UserStatus::Pending, UserStatus::Active),
    (UserStatus::Pending, UserStatus::Inactive),
    (UserStatus::Active, UserStatus::Inactive),
    (UserStatus::Active, UserStatus::Pending),
    (UserStatus::Inactive, UserStatus::Active),
    (UserStatus::Inactive, UserStatus::Pending),
];

/// Roles club management may never act on.
const MANAGEMENT_PROTECTED: [Role; 4] = [
    Role::SuperAdmin,
    Role::FederationAdmin,
    Role::ClubOwner,
    Role::ClubManager,
];

/// Roles coaches may never act on.
const COACH_PROTECTED: [Role; 6] = [
    Role::SuperAdmin,
    Role::FederationAdmin,
    Role::ClubOwner,
    Role::ClubManager,
    Role::HeadCoach,
    Role::AssistantCoach,
];

/// Target account as seen by the validator.
#[derive(Debug, Clone)]
pub struct TargetAccount {
    pub role: Role,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&UserRecord> for TargetAccount {
    fn from(record: &UserRecord) -> Self {
        Self {
            role: record.role,
            status: record.status,
            last_login_at: record.last_login_at,
        }
    }
}

/// Why a requested transition was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDenial {
    /// Target already has the requested status.
    NoOp(UserStatus),
    /// Transition is missing from the lifecycle table.
    NotAdjacent { from: UserStatus, to: UserStatus },
    /// Actor's role does not reach this target's role.
    TargetOutOfScope { actor: Role, target: Role },
    /// Actor may manage status but not deactivate.
    DeactivationNotPermitted(Role),
    /// Actor's role has no status-management rights at all.
    ActorNotPermitted(Role),
}

impl TransitionDenial {
    /// Conflict-class denials describe the target's state; the rest are
    /// permission failures.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            TransitionDenial::NoOp(_) | TransitionDenial::NotAdjacent { .. }
        )
    }
}

impl std::fmt::Display for TransitionDenial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionDenial::NoOp(status) => {
                write!(f, "User already has status '{}'", status)
            }
            TransitionDenial::NotAdjacent { from, to } => {
                write!(f, "Status change from '{}' to '{}' is not allowed", from, to)
            }
            TransitionDenial::TargetOutOfScope { actor, target } => {
                write!(f, "{} cannot change the status of {} accounts", actor, target)
            }
            TransitionDenial::DeactivationNotPermitted(role) => {
                write!(
                    f,
                    "{} cannot deactivate accounts; contact a federation administrator",
                    role
                )
            }
            TransitionDenial::ActorNotPermitted(role) => {
                write!(f, "{} cannot manage account status", role)
            }
        }
    }
}

/// Advisory notes attached to an otherwise permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionWarning {
    /// Deactivation cuts the user's access immediately.
    ImmediateAccessLoss,
    /// Target signed in within the recent-login window.
    RecentlyActive,
    /// Reactivation restores access immediately.
    AccessRestored,
    /// Activation from pending completes the approval process.
    ApprovalCompleted,
}

impl std::fmt::Display for TransitionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            TransitionWarning::ImmediateAccessLoss => {
                "User will lose all access immediately"
            }
            TransitionWarning::RecentlyActive => {
                "User was active within the last 7 days; consider notifying them"
            }
            TransitionWarning::AccessRestored => "User access will be restored immediately",
            TransitionWarning::ApprovalCompleted => {
                "Activation completes this user's approval"
            }
        };
        f.write_str(msg)
    }
}

/// Decide whether `actor` may move `target` to `new_status`.
///
/// Ok carries the warnings the caller should surface; Err carries a typed
/// denial that maps onto the HTTP error taxonomy via [`TransitionDenial::is_conflict`].
pub fn can_transition(
    target: &TargetAccount,
    new_status: UserStatus,
    actor: Role,
) -> Result<Vec<TransitionWarning>, TransitionDenial> {
    if new_status == target.status {
        return Err(TransitionDenial::NoOp(new_status));
    }

    if !ALLOWED_TRANSITIONS.contains(&(target.status, new_status)) {
        return Err(TransitionDenial::NotAdjacent {
            from: target.status,
            to: new_status,
        });
    }

    check_actor_scope(target.role, new_status, actor)?;
    Ok(collect_warnings(target, new_status))
}

fn check_actor_scope(
    target_role: Role,
    new_status: UserStatus,
    actor: Role,
) -> Result<(), TransitionDenial> {
    match actor {
        Role::SuperAdmin | Role::FederationAdmin => Ok(()),
        Role::ClubOwner | Role::ClubManager => {
            if MANAGEMENT_PROTECTED.contains(&target_role) {
                return Err(TransitionDenial::TargetOutOfScope {
                    actor,
                    target: target_role,
                });
            }
            if new_status == UserStatus::Inactive {
                return Err(TransitionDenial::DeactivationNotPermitted(actor));
            }
            Ok(())
        }
        Role::HeadCoach | Role::AssistantCoach => {
            if COACH_PROTECTED.contains(&target_role) {
                return Err(TransitionDenial::TargetOutOfScope {
                    actor,
                    target: target_role,
                });
            }
            if new_status == UserStatus::Inactive {
                return Err(TransitionDenial::DeactivationNotPermitted(actor));
            }
            Ok(())
        }
        other => Err(TransitionDenial::ActorNotPermitted(other)),
    }
}

fn collect_warnings(target: &TargetAccount, new_status: UserStatus) -> Vec<TransitionWarning> {
    let mut warnings = Vec::new();

    match (target.status, new_status) {
        (UserStatus::Active, UserStatus::Inactive) => {
            warnings.push(TransitionWarning::ImmediateAccessLoss);
            if let Some(last_login) = target.last_login_at {
                if Utc::now() - last_login <= Duration::days(RECENT_LOGIN_WINDOW_DAYS) {
                    warnings.push(TransitionWarning::RecentlyActive);
                }
            }
        }
        (UserStatus::Inactive, UserStatus::Active) => {
            warnings.push(TransitionWarning::AccessRestored);
        }
        (UserStatus::Pending, UserStatus::Active) => {
            warnings.push(TransitionWarning::ApprovalCompleted);
        }
        _ => {}
    }

    warnings
}

/// Everything a caller needs to persist a validated status change.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    /// Copy of the user document with the new status applied.
    pub user: UserRecord,
    pub previous_status: UserStatus,
    pub new_status: UserStatus,
    pub warnings: Vec<TransitionWarning>,
    pub audit: AuditLogEntry,
}

/// Validate and stage a status change for one user document.
///
/// Returns the updated copy plus the matching audit entry; the input record
/// is untouched.
pub fn apply_status_update(
    uid: &str,
    user: &UserRecord,
    new_status: UserStatus,
    reason: Option<&str>,
    actor: &Principal,
) -> Result<StatusUpdate, TransitionDenial> {
    let target = TargetAccount::from(user);
    let warnings = can_transition(&target, new_status, actor.role)?;

    let previous_status = user.status;
    let mut updated = user.clone();
    updated.status = new_status;
    updated.updated_at = Some(Utc::now());

    let audit = AuditLogEntry::new(
        AuditAction::UserStatusUpdated,
        actor,
        "user",
        uid,
        json!({
            "previousStatus": previous_status.as_str(),
            "newStatus": new_status.as_str(),
            "reason": reason,
            "roleAtTime": user.role.as_str(),
            "clubId": user.club_id,
        }),
    );

    Ok(StatusUpdate {
        user: updated,
        previous_status,
        new_status,
        warnings,
        audit,
    })
}

/// Per-target outcome of a batch pre-validation. No endpoint drives this
/// yet; bulk tooling calls it before queueing individual updates.
#[derive(Debug, Default)]
pub struct BulkValidation {
    pub allowed: Vec<String>,
    pub denied: Vec<(String, TransitionDenial)>,
}

pub fn validate_bulk<'a, I>(targets: I, new_status: UserStatus, actor: Role) -> BulkValidation
where
    I: IntoIterator<Item = (&'a str, &'a TargetAccount)>,
{
    let mut outcome = BulkValidation::default();
    for (id, target) in targets {
        match can_transition(target, new_status, actor) {
            Ok(_) => outcome.allowed.push(id.to_string()),
            Err(denial) => outcome.denied.push((id.to_string(), denial)),
        }
    }
    outcome
}
