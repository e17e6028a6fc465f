use serde::{Deserialize, Serialize};

/// An action a role may be allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    PlaceOrder,
    SubmitOrder,
    FulfillOrder,
    MakeReservation,
    ManageTables,
    ReceiveStock,
    ViewInventory,
    /// Thresholds, write-offs, ingredient registration.
    ManageInventory,
    ManageUsers,
}

impl Permission {
    pub const ALL: &'static [Permission] = &[
        Permission::PlaceOrder,
        Permission::SubmitOrder,
        Permission::FulfillOrder,
        Permission::MakeReservation,
        Permission::ManageTables,
        Permission::ReceiveStock,
        Permission::ViewInventory,
        Permission::ManageInventory,
        Permission::ManageUsers,
    ];

    /// Stable dotted name, e.g. `inventory.manage`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::PlaceOrder => "orders.place",
            Permission::SubmitOrder => "orders.submit",
            Permission::FulfillOrder => "orders.fulfill",
            Permission::MakeReservation => "reservations.make",
            Permission::ManageTables => "tables.manage",
            Permission::ReceiveStock => "inventory.receive",
            Permission::ViewInventory => "inventory.read",
            Permission::ManageInventory => "inventory.manage",
            Permission::ManageUsers => "users.manage",
        }
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
