//! Restaurant users (staff and customers).

use serde::{Deserialize, Serialize};

use larder_core::{DomainError, DomainResult, Entity, UserId};

use crate::{Permission, Role, authorize};

/// User account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// User can act in the system.
    #[default]
    Active,
    /// User is locked out of every permission.
    Suspended,
}

/// A user of the restaurant application.
///
/// # Invariants
/// - The username is non-blank.
/// - Role changes require `users.manage` and a user cannot change their own role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: String,
    role: Role,
    status: UserStatus,
}

impl User {
    pub fn new(id: UserId, username: impl Into<String>, role: Role) -> DomainResult<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        Ok(Self {
            id,
            username: username.trim().to_string(),
            role,
            status: UserStatus::Active,
        })
    }

    pub fn id_typed(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn suspend(&mut self) {
        self.status = UserStatus::Suspended;
    }

    pub fn reactivate(&mut self) {
        self.status = UserStatus::Active;
    }

    /// Change this user's role on behalf of `actor`.
    pub fn assign_role(&mut self, actor: &User, role: Role) -> DomainResult<()> {
        authorize(actor, Permission::ManageUsers)?;
        if actor.id == self.id {
            return Err(DomainError::invariant("users cannot change their own role"));
        }
        self.role = role;
        Ok(())
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_username_is_rejected() {
        assert!(User::new(UserId::new(), "  ", Role::Staff).is_err());
    }

    #[test]
    fn admin_can_promote_someone_else() {
        let admin = User::new(UserId::new(), "root", Role::Admin).unwrap();
        let mut cook = User::new(UserId::new(), "sam", Role::Staff).unwrap();

        cook.assign_role(&admin, Role::Chef).unwrap();
        assert_eq!(cook.role(), Role::Chef);
    }

    #[test]
    fn nobody_changes_their_own_role() {
        let mut admin = User::new(UserId::new(), "root", Role::Admin).unwrap();
        let actor = admin.clone();
        let err = admin.assign_role(&actor, Role::Customer).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn staff_cannot_assign_roles() {
        let staff = User::new(UserId::new(), "kim", Role::Staff).unwrap();
        let mut other = User::new(UserId::new(), "lee", Role::Customer).unwrap();
        assert_eq!(
            other.assign_role(&staff, Role::Admin),
            Err(DomainError::Unauthorized)
        );
    }
}
