//! Services layer: identity resolution, approval workflows, account
//! management, and the supporting cache/token primitives.

pub mod accounts;
pub mod approvals;
pub mod cache;
pub mod identity;
pub mod status;
pub mod token;

pub use accounts::{AccountService, MemberLink, StatusChange};
pub use approvals::{ApprovalService, RegistrationKind};
pub use cache::{CacheStats, TtlCache};
pub use identity::IdentityService;
pub use token::{JwtVerifier, StaticTokenVerifier, TokenClaims, TokenVerifier};
