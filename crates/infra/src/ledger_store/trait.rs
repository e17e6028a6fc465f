use std::sync::Arc;

use thiserror::Error;

use larder_core::{AggregateRoot, ExpectedVersion};
use larder_events::EventEnvelope;
use larder_inventory::{InventoryLedger, LedgerEvent};

/// Ledger store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (validation, insufficient stock).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The ledger moved on since the snapshot was loaded.
    #[error("optimistic concurrency check failed: expected {expected:?}, found {actual}")]
    Concurrency {
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("ledger store lock poisoned")]
    LockPoisoned,

    #[error("missing: {0}")]
    Missing(String),
}

impl StoreError {
    pub fn is_concurrency(&self) -> bool {
        matches!(self, StoreError::Concurrency { .. })
    }
}

/// Single-writer persistence for one inventory ledger.
///
/// ## Load / commit
///
/// `load()` returns an owned snapshot. Callers decide against the snapshot
/// (`Aggregate::execute`) and hand the resulting events to `append()` along
/// with the version they loaded. `append()`:
/// - checks the expected version under the store's write lock
/// - applies the events to the stored ledger
/// - journals each event as an `EventEnvelope`
/// - returns the new ledger version
///
/// A stale expectation fails with `StoreError::Concurrency` and leaves the
/// store untouched.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<InventoryLedger, StoreError>;

    fn append(
        &self,
        events: Vec<LedgerEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<u64, StoreError>;

    /// Every committed event, in commit order.
    fn journal(&self) -> Result<Vec<EventEnvelope<LedgerEvent>>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn load(&self) -> Result<InventoryLedger, StoreError> {
        (**self).load()
    }

    fn append(
        &self,
        events: Vec<LedgerEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        (**self).append(events, expected_version)
    }

    fn journal(&self) -> Result<Vec<EventEnvelope<LedgerEvent>>, StoreError> {
        (**self).journal()
    }
}

/// Run one ledger transaction with optimistic retries.
///
/// `decide` runs against a fresh snapshot and returns its result plus the
/// events to commit. A concurrency conflict reloads and decides again, at
/// most `max_retries` times; any other error is returned as is.
pub fn transact<S, T, E, F>(store: &S, max_retries: u32, mut decide: F) -> Result<T, E>
where
    S: LedgerStore + ?Sized,
    E: From<StoreError>,
    F: FnMut(&mut InventoryLedger) -> Result<(T, Vec<LedgerEvent>), E>,
{
    let mut attempt = 0;
    loop {
        let mut ledger = store.load()?;
        let loaded = ledger.version();

        let (value, events) = decide(&mut ledger)?;
        if events.is_empty() {
            return Ok(value);
        }

        let count = events.len();
        match store.append(events, ExpectedVersion::Exact(loaded)) {
            Ok(version) => {
                tracing::info!(
                    ledger_id = %ledger.id_typed(),
                    version,
                    events = count,
                    attempt,
                    "ledger committed"
                );
                return Ok(value);
            }
            Err(err) if err.is_concurrency() && attempt < max_retries => {
                attempt += 1;
                tracing::warn!(
                    ledger_id = %ledger.id_typed(),
                    loaded,
                    attempt,
                    max_retries,
                    "ledger changed during transaction, retrying"
                );
            }
            Err(err) => return Err(err.into()),
        }
    }
}
