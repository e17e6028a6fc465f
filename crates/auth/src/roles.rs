use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role of a user in the restaurant.
///
/// A closed set: every role's permissions are known at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Chef,
    Staff,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Customer, Role::Chef, Role::Staff, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Chef => "chef",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }

    /// Permissions granted by this role.
    pub fn permissions(&self) -> &'static [Permission] {
        use Permission::*;
        match self {
            Role::Customer => &[PlaceOrder, MakeReservation],
            Role::Staff => &[PlaceOrder, MakeReservation, SubmitOrder, ManageTables, ReceiveStock],
            Role::Chef => &[SubmitOrder, FulfillOrder, ReceiveStock, ManageInventory, ViewInventory],
            Role::Admin => Permission::ALL,
        }
    }

    pub fn grants(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = larder_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| larder_core::DomainError::validation(format!("unknown role '{s}'")))
    }
}
