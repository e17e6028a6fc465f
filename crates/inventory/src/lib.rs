//! Inventory ledger domain module.
//!
//! Tracks ingredient stock across received lots, applies order consumption
//! atomically (earliest expiry first), keeps the append-only usage audit
//! trail, and reports low-stock and expiring stock. Pure domain logic: no IO,
//! no storage, no logging.

pub mod error;
pub mod ingredient;
pub mod ledger;
pub mod lot;
pub mod usage;

pub use error::{InsufficientStock, LedgerError};
pub use ingredient::Ingredient;
pub use ledger::{
    ConsumptionRecorded, DiscardLot, IngredientRegistered, InventoryLedger, LedgerCommand,
    LedgerEvent, LedgerId, LotDiscarded, LotReceived, LowStock, ReceiveLot, RegisterIngredient,
    ReserveConsumption, SetThreshold, StockWithdrawn, ThresholdChanged, ThresholdCheck,
    WithdrawStock,
};
pub use lot::{LotStatus, StockLot};
pub use usage::{LotDraw, Requirement, Reservation, UsageRecord, Withdrawal};
