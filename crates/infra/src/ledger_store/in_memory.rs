use std::sync::RwLock;

use larder_core::{Aggregate, AggregateRoot, ExpectedVersion};
use larder_events::EventEnvelope;
use larder_inventory::{InventoryLedger, LedgerEvent, LedgerId};

use super::r#trait::{LedgerStore, StoreError};

#[derive(Debug)]
struct State {
    ledger: InventoryLedger,
    journal: Vec<EventEnvelope<LedgerEvent>>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    stream: String,
    state: RwLock<State>,
}

impl InMemoryLedgerStore {
    pub fn new(id: LedgerId) -> Self {
        Self {
            stream: format!("ledger-{id}"),
            state: RwLock::new(State {
                ledger: InventoryLedger::new(id),
                journal: Vec::new(),
            }),
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new(LedgerId::new())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self) -> Result<InventoryLedger, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.ledger.clone())
    }

    fn append(
        &self,
        events: Vec<LedgerEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;

        let current = state.ledger.version();
        if !expected_version.matches(current) {
            return Err(StoreError::Concurrency {
                expected: expected_version,
                actual: current,
            });
        }

        // Ledger version and journal position advance together, one per event.
        let State { ledger, journal } = &mut *state;
        for event in events {
            ledger.apply(&event);
            journal.push(EventEnvelope::wrap(
                self.stream.clone(),
                ledger.version(),
                event,
            ));
        }

        Ok(ledger.version())
    }

    fn journal(&self) -> Result<Vec<EventEnvelope<LedgerEvent>>, StoreError> {
        let state = self.state.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(state.journal.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use larder_core::Quantity;

    fn test_store() -> InMemoryLedgerStore {
        InMemoryLedgerStore::new(LedgerId::new())
    }

    fn register(store: &InMemoryLedgerStore, name: &str) -> u64 {
        let mut ledger = store.load().unwrap();
        let loaded = ledger.version();
        let events = ledger
            .execute(&larder_inventory::LedgerCommand::RegisterIngredient(
                larder_inventory::RegisterIngredient {
                    ingredient_id: larder_core::IngredientId::new(),
                    name: name.to_string(),
                    unit: "kg".to_string(),
                    threshold: Quantity::units(1),
                    occurred_at: Utc::now(),
                },
            ))
            .unwrap();
        store.append(events, ExpectedVersion::Exact(loaded)).unwrap()
    }

    #[test]
    fn append_applies_and_journals_events() {
        let store = test_store();
        assert_eq!(register(&store, "Flour"), 1);
        assert_eq!(register(&store, "Salt"), 2);

        let ledger = store.load().unwrap();
        assert_eq!(ledger.ingredients().len(), 2);

        let journal = store.journal().unwrap();
        assert_eq!(journal.len(), 2);
        assert_eq!(journal[0].sequence_number(), 1);
        assert_eq!(journal[1].sequence_number(), 2);
        assert_eq!(journal[0].event_type(), "inventory.ingredient.registered");
        assert_eq!(journal[0].stream(), store.stream());
    }

    #[test]
    fn stale_writer_is_rejected_without_effect() {
        let store = test_store();
        let stale = store.load().unwrap();
        register(&store, "Flour");

        let mut ledger = stale.clone();
        let events = ledger
            .execute(&larder_inventory::LedgerCommand::RegisterIngredient(
                larder_inventory::RegisterIngredient {
                    ingredient_id: larder_core::IngredientId::new(),
                    name: "Yeast".to_string(),
                    unit: "g".to_string(),
                    threshold: Quantity::ZERO,
                    occurred_at: Utc::now(),
                },
            ))
            .unwrap();

        let err = store
            .append(events, ExpectedVersion::Exact(stale.version()))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Concurrency {
                expected: ExpectedVersion::Exact(0),
                actual: 1
            }
        );
        assert_eq!(store.load().unwrap().ingredients().len(), 1);
        assert_eq!(store.journal().unwrap().len(), 1);
    }

    #[test]
    fn journal_replays_to_the_stored_ledger() {
        let store = test_store();
        register(&store, "Flour");
        let mut ledger = store.load().unwrap();
        let id = ledger.ingredients()[0].id_typed();
        let loaded = ledger.version();
        let events = ledger
            .execute(&larder_inventory::LedgerCommand::ReceiveLot(
                larder_inventory::ReceiveLot {
                    lot_id: larder_core::LotId::new(),
                    ingredient_id: id,
                    quantity: Quantity::units(5),
                    expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
                    storage_location: "dry store".to_string(),
                    occurred_at: Utc::now(),
                },
            ))
            .unwrap();
        store.append(events, ExpectedVersion::Exact(loaded)).unwrap();

        let journal = store.journal().unwrap();
        let replayed = InventoryLedger::replay(
            store.load().unwrap().id_typed(),
            journal.iter().map(|e| e.payload()),
        );
        assert_eq!(replayed, store.load().unwrap());
    }
}
