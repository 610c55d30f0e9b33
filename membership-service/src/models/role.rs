//! Role hierarchy and permission predicates.
//!
//! Roles form a total order by authority level. Every permission decision
//! in the service reduces to either a level comparison or membership in
//! one of the fixed sets below.

use serde::{Deserialize, Serialize};

/// Platform roles, broadest authority first.
///
/// Values outside the closed set deserialize to [`Role::Unknown`], which
/// ranks below every defined role and satisfies no predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    FederationAdmin,
    FederationSecretariat,
    CommitteeChair,
    CommitteeMember,
    ClubOwner,
    ClubManager,
    HeadCoach,
    MediaManager,
    ClubStaff,
    AssistantCoach,
    Member,
    Parent,
    Vendor,
    #[serde(other)]
    Unknown,
}

impl Role {
    /// Authority level; higher is broader.
    pub fn level(&self) -> u8 {
        match self {
            Role::SuperAdmin => 100,
            Role::FederationAdmin => 90,
            Role::FederationSecretariat => 80,
            Role::CommitteeChair => 70,
            Role::CommitteeMember => 60,
            Role::ClubOwner => 50,
            Role::ClubManager => 40,
            Role::HeadCoach => 35,
            Role::MediaManager => 30,
            Role::ClubStaff => 25,
            Role::AssistantCoach => 20,
            Role::Member => 10,
            Role::Parent => 5,
            Role::Vendor => 1,
            Role::Unknown => 0,
        }
    }

    /// Level comparison, not equality. Unknown roles never qualify.
    pub fn has_at_least(&self, threshold: Role) -> bool {
        *self != Role::Unknown && self.level() >= threshold.level()
    }

    /// Strictly-greater level comparison; peers never manage peers.
    pub fn can_manage(&self, target: Role) -> bool {
        self.level() > target.level()
    }

    /// Global administrators.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::FederationAdmin)
    }

    /// Club-management plus coaching roles.
    pub fn is_club_staff(&self) -> bool {
        matches!(
            self,
            Role::ClubOwner
                | Role::ClubManager
                | Role::ClubStaff
                | Role::MediaManager
                | Role::HeadCoach
                | Role::AssistantCoach
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::FederationAdmin => "FEDERATION_ADMIN",
            Role::FederationSecretariat => "FEDERATION_SECRETARIAT",
            Role::CommitteeChair => "COMMITTEE_CHAIR",
            Role::CommitteeMember => "COMMITTEE_MEMBER",
            Role::ClubOwner => "CLUB_OWNER",
            Role::ClubManager => "CLUB_MANAGER",
            Role::HeadCoach => "HEAD_COACH",
            Role::MediaManager => "MEDIA_MANAGER",
            Role::ClubStaff => "CLUB_STAFF",
            Role::AssistantCoach => "ASSISTANT_COACH",
            Role::Member => "MEMBER",
            Role::Parent => "PARENT",
            Role::Vendor => "VENDOR",
            Role::Unknown => "UNKNOWN",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Unknown
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
