//! Low-stock alerting and the expiring-stock report.

pub mod monitor;
pub mod notifier;

pub use monitor::{ExpiringLot, LowStockAlert, ThresholdMonitor};
pub use notifier::{InMemoryNotifier, LowStockNotifier, TracingNotifier};
