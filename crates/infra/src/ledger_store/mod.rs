//! Ledger persistence boundary.
//!
//! A store hands out request-scoped ledger snapshots and accepts the events
//! decided against a snapshot, guarded by the snapshot's version.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{LedgerStore, StoreError, transact};
