//! Append-only audit log entries, one per committed transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;
use super::user::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ApproveMemberRegistration,
    ApproveFamilyRegistration,
    RejectMemberRegistration,
    RejectFamilyRegistration,
    ApprovePassRequest,
    RejectPassRequest,
    CancelPass,
    UserStatusUpdated,
    LinkUserMember,
}

/// Audit log document. Never mutated or deleted by this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub action: AuditAction,
    pub performed_by: String,
    pub performed_by_role: Role,
    pub target_type: String,
    pub target_id: String,
    pub metadata: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        action: AuditAction,
        actor: &Principal,
        target_type: &str,
        target_id: impl Into<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            action,
            performed_by: actor.uid.clone(),
            performed_by_role: actor.role,
            target_type: target_type.to_string(),
            target_id: target_id.into(),
            metadata,
            timestamp: Utc::now(),
        }
    }
}
