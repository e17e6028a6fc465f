//! `larder-auth`: roles, users and the permission check applied at the
//! administrative boundary (threshold changes, stock receipts, write-offs).
//!
//! Decoupled from HTTP, tokens and password storage.

pub mod authorize;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{AuthzError, authorize};
pub use permissions::Permission;
pub use roles::Role;
pub use user::{User, UserStatus};
