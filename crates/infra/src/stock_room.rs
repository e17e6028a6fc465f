//! Administrative stock operations: ingredients, deliveries, thresholds,
//! manual withdrawals and write-offs, each committed as its own ledger
//! transaction.

use chrono::{DateTime, NaiveDate, Utc};

use larder_auth::{Permission, User, authorize};
use larder_core::{Aggregate, IngredientId, LotId, Quantity};
use larder_inventory::{
    DiscardLot, LedgerCommand, LedgerEvent, LotDraw, ReceiveLot, RegisterIngredient, SetThreshold,
    WithdrawStock,
};

use crate::config::LarderConfig;
use crate::error::ServiceError;
use crate::ledger_store::{LedgerStore, transact};

pub struct StockRoom<S> {
    store: S,
    config: LarderConfig,
}

impl<S> StockRoom<S>
where
    S: LedgerStore,
{
    pub fn new(store: S, config: LarderConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn run(&self, command: LedgerCommand) -> Result<Vec<LedgerEvent>, ServiceError> {
        transact(&self.store, self.config.max_commit_retries, |ledger| {
            let events = ledger.execute(&command)?;
            Ok::<_, ServiceError>((events.clone(), events))
        })
    }

    pub fn register_ingredient(
        &self,
        actor: &User,
        name: impl Into<String>,
        unit: impl Into<String>,
        threshold: Quantity,
        occurred_at: DateTime<Utc>,
    ) -> Result<IngredientId, ServiceError> {
        authorize(actor, Permission::ManageInventory)?;

        let ingredient_id = IngredientId::new();
        self.run(LedgerCommand::RegisterIngredient(RegisterIngredient {
            ingredient_id,
            name: name.into(),
            unit: unit.into(),
            threshold,
            occurred_at,
        }))?;
        Ok(ingredient_id)
    }

    /// Record a delivery as a new lot.
    pub fn receive_lot(
        &self,
        actor: &User,
        ingredient_id: IngredientId,
        quantity: Quantity,
        expiry_date: NaiveDate,
        storage_location: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<LotId, ServiceError> {
        authorize(actor, Permission::ReceiveStock)?;

        let lot_id = LotId::new();
        self.run(LedgerCommand::ReceiveLot(ReceiveLot {
            lot_id,
            ingredient_id,
            quantity,
            expiry_date,
            storage_location: storage_location.into(),
            occurred_at,
        }))?;
        tracing::info!(%ingredient_id, %lot_id, %quantity, %expiry_date, "lot received");
        Ok(lot_id)
    }

    pub fn set_threshold(
        &self,
        actor: &User,
        ingredient_id: IngredientId,
        threshold: Quantity,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        authorize(actor, Permission::ManageInventory)?;

        let events = self.run(LedgerCommand::SetThreshold(SetThreshold {
            ingredient_id,
            threshold,
            occurred_at,
        }))?;
        if !events.is_empty() {
            tracing::info!(%ingredient_id, %threshold, actor = %actor.username(), "threshold changed");
        }
        Ok(())
    }

    /// Take part of an ingredient's stock out, earliest expiry first.
    /// Returns the lots drawn from.
    pub fn withdraw_stock(
        &self,
        actor: &User,
        ingredient_id: IngredientId,
        quantity: Quantity,
        reason: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<LotDraw>, ServiceError> {
        authorize(actor, Permission::ManageInventory)?;

        let reason = reason.into();
        let events = self.run(LedgerCommand::WithdrawStock(WithdrawStock {
            ingredient_id,
            quantity,
            reason: reason.clone(),
            occurred_at,
        }))?;
        let draws: Vec<LotDraw> = events
            .into_iter()
            .flat_map(|e| match e {
                LedgerEvent::StockWithdrawn(w) => w.draws,
                _ => Vec::new(),
            })
            .collect();
        tracing::info!(%ingredient_id, %quantity, reason = %reason, lots = draws.len(), "stock withdrawn");
        Ok(draws)
    }

    /// Write off whatever remains of a lot. Returns the amount written off.
    pub fn discard_lot(
        &self,
        actor: &User,
        lot_id: LotId,
        reason: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Quantity, ServiceError> {
        authorize(actor, Permission::ManageInventory)?;

        let events = self.run(LedgerCommand::DiscardLot(DiscardLot {
            lot_id,
            reason: reason.into(),
            occurred_at,
        }))?;
        Ok(discarded(&events))
    }

    /// Write off every expired lot that still holds stock, in one transaction.
    pub fn write_off_expired(
        &self,
        actor: &User,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<(LotId, Quantity)>, ServiceError> {
        authorize(actor, Permission::ManageInventory)?;
        let today = occurred_at.date_naive();

        let events = transact(&self.store, self.config.max_commit_retries, |ledger| {
            let expired: Vec<LotId> = ledger
                .expired_lots(today)
                .into_iter()
                .map(|lot| lot.id_typed())
                .collect();

            let mut events = Vec::new();
            for lot_id in expired {
                events.extend(ledger.execute(&LedgerCommand::DiscardLot(DiscardLot {
                    lot_id,
                    reason: "expired".to_string(),
                    occurred_at,
                }))?);
            }
            Ok::<_, ServiceError>((events.clone(), events))
        })?;

        let written_off: Vec<(LotId, Quantity)> = events
            .iter()
            .filter_map(|e| match e {
                LedgerEvent::LotDiscarded(d) => Some((d.lot_id, d.quantity)),
                _ => None,
            })
            .collect();
        if !written_off.is_empty() {
            tracing::info!(lots = written_off.len(), %today, "expired lots written off");
        }
        Ok(written_off)
    }
}

fn discarded(events: &[LedgerEvent]) -> Quantity {
    events
        .iter()
        .filter_map(|e| match e {
            LedgerEvent::LotDiscarded(d) => Some(d.quantity),
            _ => None,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use larder_auth::Role;
    use larder_core::{DomainError, UserId};
    use larder_inventory::LedgerId;

    use crate::ledger_store::InMemoryLedgerStore;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn test_user(role: Role) -> User {
        User::new(UserId::new(), "morgan", role).unwrap()
    }

    fn test_room() -> StockRoom<Arc<InMemoryLedgerStore>> {
        StockRoom::new(
            Arc::new(InMemoryLedgerStore::new(LedgerId::new())),
            LarderConfig::default(),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn chef_registers_and_staff_receives() {
        let room = test_room();
        let chef = test_user(Role::Chef);
        let flour = room
            .register_ingredient(&chef, "Flour", "kg", Quantity::units(2), test_time())
            .unwrap();
        room.receive_lot(
            &test_user(Role::Staff),
            flour,
            Quantity::units(5),
            date(2031, 1, 1),
            "dry store",
            test_time(),
        )
        .unwrap();

        let ledger = room.store().load().unwrap();
        assert_eq!(ledger.available(flour), Quantity::units(5));
        assert_eq!(room.store().journal().unwrap().len(), 2);
    }

    #[test]
    fn threshold_changes_need_inventory_management() {
        let room = test_room();
        let admin = test_user(Role::Admin);
        let flour = room
            .register_ingredient(&admin, "Flour", "kg", Quantity::units(2), test_time())
            .unwrap();

        let err = room
            .set_threshold(&test_user(Role::Staff), flour, Quantity::units(9), test_time())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        room.set_threshold(&test_user(Role::Chef), flour, Quantity::units(9), test_time())
            .unwrap();
        let ledger = room.store().load().unwrap();
        assert_eq!(ledger.ingredient(flour).unwrap().threshold(), Quantity::units(9));
    }

    #[test]
    fn unchanged_threshold_commits_nothing() {
        let room = test_room();
        let admin = test_user(Role::Admin);
        let flour = room
            .register_ingredient(&admin, "Flour", "kg", Quantity::units(2), test_time())
            .unwrap();

        room.set_threshold(&admin, flour, Quantity::units(2), test_time())
            .unwrap();
        assert_eq!(room.store().journal().unwrap().len(), 1);
    }

    #[test]
    fn unknown_ingredient_is_not_found() {
        let room = test_room();
        let err = room
            .receive_lot(
                &test_user(Role::Admin),
                IngredientId::new(),
                Quantity::units(1),
                date(2031, 1, 1),
                "walk-in",
                test_time(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Ledger(larder_inventory::LedgerError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[test]
    fn withdrawal_needs_inventory_management_and_enough_stock() {
        let room = test_room();
        let chef = test_user(Role::Chef);
        let oil = room
            .register_ingredient(&chef, "Oil", "l", Quantity::units(1), test_time())
            .unwrap();
        let old = room
            .receive_lot(&chef, oil, Quantity::units(2), date(2031, 2, 1), "cellar", test_time())
            .unwrap();
        let new = room
            .receive_lot(&chef, oil, Quantity::units(4), date(2031, 6, 1), "cellar", test_time())
            .unwrap();

        let err = room
            .withdraw_stock(&test_user(Role::Staff), oil, Quantity::units(1), "spill", test_time())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        let journal_len = room.store().journal().unwrap().len();
        let err = room
            .withdraw_stock(&chef, oil, Quantity::units(7), "transfer", test_time())
            .unwrap_err();
        assert_eq!(err.insufficient_stock().unwrap().available, Quantity::units(6));
        assert_eq!(room.store().journal().unwrap().len(), journal_len);

        let draws = room
            .withdraw_stock(&chef, oil, Quantity::units(3), "transfer", test_time())
            .unwrap();
        assert_eq!(
            draws,
            vec![
                LotDraw { lot_id: old, quantity: Quantity::units(2) },
                LotDraw { lot_id: new, quantity: Quantity::units(1) },
            ]
        );

        let ledger = room.store().load().unwrap();
        assert_eq!(ledger.available(oil), Quantity::units(3));
        assert_eq!(ledger.withdrawals().len(), 1);
    }

    #[test]
    fn expired_lots_are_written_off() {
        let room = test_room();
        let admin = test_user(Role::Admin);
        let milk = room
            .register_ingredient(&admin, "Milk", "l", Quantity::units(1), test_time())
            .unwrap();
        let old = room
            .receive_lot(&admin, milk, Quantity::units(4), date(2030, 5, 1), "fridge", test_time())
            .unwrap();
        room.receive_lot(&admin, milk, Quantity::units(6), date(2030, 5, 20), "fridge", test_time())
            .unwrap();

        let at = date(2030, 5, 10).and_hms_opt(8, 0, 0).unwrap().and_utc();
        let written_off = room.write_off_expired(&admin, at).unwrap();

        assert_eq!(written_off, vec![(old, Quantity::units(4))]);
        assert_eq!(room.store().load().unwrap().available(milk), Quantity::units(6));

        // Nothing left to write off.
        assert!(room.write_off_expired(&admin, at).unwrap().is_empty());
    }
}
