use thiserror::Error;

use larder_core::DomainError;

use crate::{Permission, User, UserStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user is suspended")]
    Suspended,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),
}

impl From<AuthzError> for DomainError {
    fn from(_: AuthzError) -> Self {
        DomainError::Unauthorized
    }
}

/// Check that `user` may perform `required`.
///
/// - No IO
/// - No panics
/// - Pure policy check over the user's role and status
pub fn authorize(user: &User, required: Permission) -> Result<(), AuthzError> {
    if user.status() == UserStatus::Suspended {
        return Err(AuthzError::Suspended);
    }
    if user.role().grants(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required))
    }
}
