//! Infrastructure layer: ledger persistence, order submission, stock
//! operations, alerting and configuration.

pub mod alerts;
pub mod config;
pub mod error;
pub mod ledger_store;
pub mod stock_room;
pub mod submission;

pub use alerts::{
    ExpiringLot, InMemoryNotifier, LowStockAlert, LowStockNotifier, ThresholdMonitor,
    TracingNotifier,
};
pub use config::{ConfigError, LarderConfig};
pub use error::ServiceError;
pub use ledger_store::{InMemoryLedgerStore, LedgerStore, StoreError, transact};
pub use stock_room::StockRoom;
pub use submission::OrderSubmission;
