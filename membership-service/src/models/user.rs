//! User account documents and the per-request principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;

/// Account lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Pending,
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored user document (keyed by uid in the users collection).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub email: String,
    #[serde(default)]
    pub role: Role,
    pub status: UserStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_member_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Role/status slice held by the identity cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySnapshot {
    pub role: Role,
    pub status: UserStatus,
    pub club_id: Option<String>,
    pub club_name: Option<String>,
}

impl From<&UserRecord> for IdentitySnapshot {
    fn from(record: &UserRecord) -> Self {
        Self {
            role: record.role,
            status: record.status,
            club_id: record.club_id.clone(),
            club_name: record.club_name.clone(),
        }
    }
}

/// Authenticated actor attached to request extensions by the gateway.
///
/// Immutable per-request snapshot; email comes from the verified token,
/// everything else from the resolved identity.
#[derive(Debug, Clone)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub club_id: Option<String>,
    pub club_name: Option<String>,
}

impl Principal {
    /// Admins act across clubs; everyone else must match.
    pub fn belongs_to_club(&self, club_id: &str) -> bool {
        self.role.is_admin() || self.club_id.as_deref() == Some(club_id)
    }
}
