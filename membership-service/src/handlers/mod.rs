//! HTTP handlers for the membership admin API.

pub mod admin;
pub mod approvals;
pub mod health;
pub mod passes;
pub mod users;

pub use admin::*;
pub use approvals::*;
pub use health::*;
pub use passes::*;
pub use users::*;
