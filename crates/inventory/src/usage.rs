use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{IngredientId, LotId, MenuItemId, OrderId, Quantity, ValueObject};

/// One ingredient amount an order needs, attributed to the menu item that
/// needs it. Produced by expanding order lines through recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub ingredient_id: IngredientId,
    pub menu_item_id: MenuItemId,
    pub quantity: Quantity,
}

impl ValueObject for Requirement {}

/// The part of one lot consumed by one usage record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotDraw {
    pub lot_id: LotId,
    pub quantity: Quantity,
}

impl ValueObject for LotDraw {}

/// Immutable audit fact: `quantity` of an ingredient was consumed for a menu
/// item of an order.
///
/// Records are only ever appended to the ledger. `sequence` is the record's
/// 1-based position in the ledger's usage log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub sequence: u64,
    pub ingredient_id: IngredientId,
    pub menu_item_id: MenuItemId,
    pub order_id: OrderId,
    pub quantity: Quantity,
    pub used_at: DateTime<Utc>,
    /// Lots drawn from, in depletion order.
    pub draws: Vec<LotDraw>,
}

/// Stock taken out by hand rather than by an order: spoilage found on a
/// shelf, a staff meal, a transfer to another kitchen.
///
/// Appended to the ledger like usage records. `sequence` is the 1-based
/// position in the withdrawal log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub sequence: u64,
    pub ingredient_id: IngredientId,
    pub quantity: Quantity,
    pub reason: String,
    pub withdrawn_at: DateTime<Utc>,
    pub draws: Vec<LotDraw>,
}

/// Accepted consumption for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub order_id: OrderId,
    pub records: Vec<UsageRecord>,
}

impl Reservation {
    /// Total consumed of one ingredient by this reservation.
    pub fn total_for(&self, ingredient_id: IngredientId) -> Quantity {
        self.records
            .iter()
            .filter(|r| r.ingredient_id == ingredient_id)
            .map(|r| r.quantity)
            .sum()
    }

    /// Every lot draw, in record order.
    pub fn draws(&self) -> impl Iterator<Item = &LotDraw> {
        self.records.iter().flat_map(|r| r.draws.iter())
    }
}
