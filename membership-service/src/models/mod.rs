pub mod approval;
pub mod audit;
pub mod member;
pub mod pass;
pub mod role;
pub mod user;

pub use approval::{
    ExternalGuardian, FamilyChild, FamilyParent, FamilyRegistrationRequest,
    MemberRegistrationRequest, PassRequest, PassRequestKind, RequestStatus,
};
pub use audit::{AuditAction, AuditLogEntry};
pub use member::{FamilyRole, Member, MemberCategory, MemberStatus};
pub use pass::{MemberPass, PassKind, PassStatus, PassTemplate, PaymentStatus};
pub use role::Role;
pub use user::{IdentitySnapshot, Principal, UserRecord, UserStatus};
