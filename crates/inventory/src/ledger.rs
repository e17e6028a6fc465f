use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use larder_core::{
    Aggregate, AggregateRoot, DomainError, IngredientId, LotId, MenuItemId, OrderId, Quantity,
};
use larder_events::Event;

use crate::error::{InsufficientStock, LedgerError};
use crate::ingredient::Ingredient;
use crate::lot::{StockLot, warning_horizon};
use crate::usage::{LotDraw, Requirement, Reservation, UsageRecord, Withdrawal};

/// Ledger identifier (one ledger per restaurant stock room).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerId(Uuid);

impl LedgerId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for LedgerId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for LedgerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: the inventory ledger.
///
/// Owns every ingredient, lot and usage record of one stock room. All
/// mutation goes through `handle` (decide, no mutation) followed by `apply`,
/// so a rejected command never leaves partial effects behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryLedger {
    id: LedgerId,
    /// Registration order; drives the order of threshold reports.
    ingredients: Vec<Ingredient>,
    ingredient_index: HashMap<IngredientId, usize>,
    /// Insertion order.
    lots: Vec<StockLot>,
    lot_index: HashMap<LotId, usize>,
    usage: Vec<UsageRecord>,
    withdrawals: Vec<Withdrawal>,
    version: u64,
}

impl InventoryLedger {
    pub fn new(id: LedgerId) -> Self {
        Self {
            id,
            ingredients: Vec::new(),
            ingredient_index: HashMap::new(),
            lots: Vec::new(),
            lot_index: HashMap::new(),
            usage: Vec::new(),
            withdrawals: Vec::new(),
            version: 0,
        }
    }

    /// Rebuild a ledger from its event history.
    pub fn replay<'a>(id: LedgerId, events: impl IntoIterator<Item = &'a LedgerEvent>) -> Self {
        let mut ledger = Self::new(id);
        for event in events {
            ledger.apply(event);
        }
        ledger
    }

    pub fn id_typed(&self) -> LedgerId {
        self.id
    }

    pub fn ingredient(&self, id: IngredientId) -> Option<&Ingredient> {
        self.ingredient_index.get(&id).map(|&i| &self.ingredients[i])
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn lot(&self, id: LotId) -> Option<&StockLot> {
        self.lot_index.get(&id).map(|&i| &self.lots[i])
    }

    /// Lots of one ingredient in depletion order (earliest expiry, then oldest).
    pub fn lots(&self, ingredient_id: IngredientId) -> Vec<&StockLot> {
        let mut lots: Vec<&StockLot> = self
            .lots
            .iter()
            .filter(|l| l.ingredient_id() == ingredient_id)
            .collect();
        lots.sort_by_key(|l| l.fifo_key());
        lots
    }

    /// Total quantity on hand across all lots of an ingredient.
    pub fn available(&self, ingredient_id: IngredientId) -> Quantity {
        self.lots
            .iter()
            .filter(|l| l.ingredient_id() == ingredient_id)
            .map(|l| l.remaining())
            .sum()
    }

    pub fn total_received(&self, ingredient_id: IngredientId) -> Quantity {
        self.lots
            .iter()
            .filter(|l| l.ingredient_id() == ingredient_id)
            .map(|l| l.received())
            .sum()
    }

    pub fn total_consumed(&self, ingredient_id: IngredientId) -> Quantity {
        self.usage_for(ingredient_id).map(|r| r.quantity).sum()
    }

    /// The append-only usage log, oldest first.
    pub fn usage_records(&self) -> &[UsageRecord] {
        &self.usage
    }

    pub fn usage_for(&self, ingredient_id: IngredientId) -> impl Iterator<Item = &UsageRecord> {
        self.usage
            .iter()
            .filter(move |r| r.ingredient_id == ingredient_id)
    }

    /// Usage records with `from <= used_at <= to`, oldest first.
    pub fn usage_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Iterator<Item = &UsageRecord> {
        self.usage
            .iter()
            .filter(move |r| from <= r.used_at && r.used_at <= to)
    }

    /// Lots received with `from <= received_at <= to`, in receipt order.
    pub fn receipts_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Iterator<Item = &StockLot> {
        self.lots
            .iter()
            .filter(move |l| from <= l.received_at() && l.received_at() <= to)
    }

    /// The manual withdrawal log, oldest first.
    pub fn withdrawals(&self) -> &[Withdrawal] {
        &self.withdrawals
    }

    /// Withdrawals with `from <= withdrawn_at <= to`, oldest first.
    pub fn withdrawals_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Iterator<Item = &Withdrawal> {
        self.withdrawals
            .iter()
            .filter(move |w| from <= w.withdrawn_at && w.withdrawn_at <= to)
    }

    /// Ingredients whose total quantity is at or below their threshold.
    ///
    /// The returned iterator is lazy and `Clone`; calling this again starts a
    /// fresh pass over the current state.
    pub fn check_thresholds(&self) -> ThresholdCheck<'_> {
        ThresholdCheck {
            ledger: self,
            next: 0,
        }
    }

    /// Lots with stock left that expire on or before `today + within_days`,
    /// earliest expiry first. Already-expired lots are included.
    pub fn expiring_lots(&self, today: NaiveDate, within_days: u32) -> Vec<&StockLot> {
        let horizon = warning_horizon(today, within_days);
        let mut lots: Vec<&StockLot> = self
            .lots
            .iter()
            .filter(|l| !l.is_depleted() && l.expiry_date() <= horizon)
            .collect();
        lots.sort_by_key(|l| l.fifo_key());
        lots
    }

    /// Lots with stock left whose expiry date is before `today`.
    pub fn expired_lots(&self, today: NaiveDate) -> Vec<&StockLot> {
        self.lots
            .iter()
            .filter(|l| !l.is_depleted() && l.is_expired(today))
            .collect()
    }

    /// Atomically consume the stock an order needs.
    ///
    /// Either every requirement is satisfied (lots drawn earliest-expiry
    /// first, one usage record per ingredient and menu item) or nothing
    /// changes and the first short ingredient is reported.
    pub fn reserve_consumption(
        &mut self,
        order_id: OrderId,
        requirements: Vec<Requirement>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Reservation, LedgerError> {
        let command = LedgerCommand::ReserveConsumption(ReserveConsumption {
            order_id,
            requirements,
            occurred_at,
        });
        let events = self.execute(&command)?;
        Ok(Reservation::from_events(order_id, &events))
    }

    pub fn register_ingredient(
        &mut self,
        name: impl Into<String>,
        unit: impl Into<String>,
        threshold: Quantity,
        occurred_at: DateTime<Utc>,
    ) -> Result<IngredientId, LedgerError> {
        let ingredient_id = IngredientId::new();
        self.execute(&LedgerCommand::RegisterIngredient(RegisterIngredient {
            ingredient_id,
            name: name.into(),
            unit: unit.into(),
            threshold,
            occurred_at,
        }))?;
        Ok(ingredient_id)
    }

    pub fn receive_lot(
        &mut self,
        ingredient_id: IngredientId,
        quantity: Quantity,
        expiry_date: NaiveDate,
        storage_location: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<LotId, LedgerError> {
        let lot_id = LotId::new();
        self.execute(&LedgerCommand::ReceiveLot(ReceiveLot {
            lot_id,
            ingredient_id,
            quantity,
            expiry_date,
            storage_location: storage_location.into(),
            occurred_at,
        }))?;
        Ok(lot_id)
    }

    pub fn set_threshold(
        &mut self,
        ingredient_id: IngredientId,
        threshold: Quantity,
        occurred_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.execute(&LedgerCommand::SetThreshold(SetThreshold {
            ingredient_id,
            threshold,
            occurred_at,
        }))?;
        Ok(())
    }

    /// Take `quantity` of an ingredient out by hand, earliest expiry first.
    /// Returns the lots drawn from.
    pub fn withdraw_stock(
        &mut self,
        ingredient_id: IngredientId,
        quantity: Quantity,
        reason: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Vec<LotDraw>, LedgerError> {
        let events = self.execute(&LedgerCommand::WithdrawStock(WithdrawStock {
            ingredient_id,
            quantity,
            reason: reason.into(),
            occurred_at,
        }))?;
        Ok(events
            .into_iter()
            .flat_map(|e| match e {
                LedgerEvent::StockWithdrawn(e) => e.draws,
                _ => Vec::new(),
            })
            .collect())
    }

    /// Write off whatever is left of a lot. Returns the discarded quantity.
    pub fn discard_lot(
        &mut self,
        lot_id: LotId,
        reason: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Result<Quantity, LedgerError> {
        let events = self.execute(&LedgerCommand::DiscardLot(DiscardLot {
            lot_id,
            reason: reason.into(),
            occurred_at,
        }))?;
        Ok(events
            .iter()
            .map(|e| match e {
                LedgerEvent::LotDiscarded(e) => e.quantity,
                _ => Quantity::ZERO,
            })
            .sum())
    }
}

impl Reservation {
    /// Collect the usage records `events` recorded for `order_id`.
    pub fn from_events(order_id: OrderId, events: &[LedgerEvent]) -> Self {
        let records = events
            .iter()
            .filter_map(|e| match e {
                LedgerEvent::ConsumptionRecorded(e) if e.order_id == order_id => Some(&e.records),
                _ => None,
            })
            .flatten()
            .cloned()
            .collect();

        Self { order_id, records }
    }
}

impl AggregateRoot for InventoryLedger {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// An ingredient at or below its threshold, with its current total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowStock<'a> {
    pub ingredient: &'a Ingredient,
    pub current: Quantity,
}

/// Lazy low-stock pass over a ledger. See [`InventoryLedger::check_thresholds`].
#[derive(Debug, Clone)]
pub struct ThresholdCheck<'a> {
    ledger: &'a InventoryLedger,
    next: usize,
}

impl<'a> Iterator for ThresholdCheck<'a> {
    type Item = LowStock<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ingredient) = self.ledger.ingredients.get(self.next) {
            self.next += 1;
            let current = self.ledger.available(ingredient.id_typed());
            if current <= ingredient.threshold() {
                return Some(LowStock {
                    ingredient,
                    current,
                });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.ledger.ingredients.len() - self.next))
    }
}

/// Command: RegisterIngredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterIngredient {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub unit: String,
    pub threshold: Quantity,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReceiveLot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveLot {
    pub lot_id: LotId,
    pub ingredient_id: IngredientId,
    pub quantity: Quantity,
    pub expiry_date: NaiveDate,
    pub storage_location: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetThreshold (administrative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetThreshold {
    pub ingredient_id: IngredientId,
    pub threshold: Quantity,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReserveConsumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveConsumption {
    pub order_id: OrderId,
    pub requirements: Vec<Requirement>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: WithdrawStock. Partial, manual removal of an ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawStock {
    pub ingredient_id: IngredientId,
    pub quantity: Quantity,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DiscardLot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscardLot {
    pub lot_id: LotId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    RegisterIngredient(RegisterIngredient),
    ReceiveLot(ReceiveLot),
    SetThreshold(SetThreshold),
    ReserveConsumption(ReserveConsumption),
    WithdrawStock(WithdrawStock),
    DiscardLot(DiscardLot),
}

/// Event: IngredientRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientRegistered {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub unit: String,
    pub threshold: Quantity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LotReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotReceived {
    pub lot_id: LotId,
    pub ingredient_id: IngredientId,
    pub quantity: Quantity,
    pub expiry_date: NaiveDate,
    pub storage_location: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ThresholdChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdChanged {
    pub ingredient_id: IngredientId,
    pub previous: Quantity,
    pub threshold: Quantity,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ConsumptionRecorded. One per accepted reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRecorded {
    pub order_id: OrderId,
    pub records: Vec<UsageRecord>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockWithdrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockWithdrawn {
    pub ingredient_id: IngredientId,
    pub quantity: Quantity,
    pub reason: String,
    pub draws: Vec<LotDraw>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LotDiscarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotDiscarded {
    pub lot_id: LotId,
    pub ingredient_id: IngredientId,
    pub quantity: Quantity,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    IngredientRegistered(IngredientRegistered),
    LotReceived(LotReceived),
    ThresholdChanged(ThresholdChanged),
    ConsumptionRecorded(ConsumptionRecorded),
    StockWithdrawn(StockWithdrawn),
    LotDiscarded(LotDiscarded),
}

impl Event for LedgerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::IngredientRegistered(_) => "inventory.ingredient.registered",
            LedgerEvent::LotReceived(_) => "inventory.lot.received",
            LedgerEvent::ThresholdChanged(_) => "inventory.ingredient.threshold_changed",
            LedgerEvent::ConsumptionRecorded(_) => "inventory.consumption.recorded",
            LedgerEvent::StockWithdrawn(_) => "inventory.stock.withdrawn",
            LedgerEvent::LotDiscarded(_) => "inventory.lot.discarded",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LedgerEvent::IngredientRegistered(e) => e.occurred_at,
            LedgerEvent::LotReceived(e) => e.occurred_at,
            LedgerEvent::ThresholdChanged(e) => e.occurred_at,
            LedgerEvent::ConsumptionRecorded(e) => e.occurred_at,
            LedgerEvent::StockWithdrawn(e) => e.occurred_at,
            LedgerEvent::LotDiscarded(e) => e.occurred_at,
        }
    }
}

impl Aggregate for InventoryLedger {
    type Command = LedgerCommand;
    type Event = LedgerEvent;
    type Error = LedgerError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LedgerEvent::IngredientRegistered(e) => {
                self.ingredient_index
                    .insert(e.ingredient_id, self.ingredients.len());
                self.ingredients.push(Ingredient::new(
                    e.ingredient_id,
                    e.name.clone(),
                    e.unit.clone(),
                    e.threshold,
                ));
            }
            LedgerEvent::LotReceived(e) => {
                let sequence = self.lots.len() as u64 + 1;
                self.lot_index.insert(e.lot_id, self.lots.len());
                self.lots.push(StockLot::new(
                    e.lot_id,
                    e.ingredient_id,
                    e.quantity,
                    e.expiry_date,
                    e.storage_location.clone(),
                    sequence,
                    e.occurred_at,
                ));
            }
            LedgerEvent::ThresholdChanged(e) => {
                if let Some(&i) = self.ingredient_index.get(&e.ingredient_id) {
                    self.ingredients[i].set_threshold(e.threshold);
                }
            }
            LedgerEvent::ConsumptionRecorded(e) => {
                for record in &e.records {
                    for draw in &record.draws {
                        if let Some(&i) = self.lot_index.get(&draw.lot_id) {
                            self.lots[i].draw(draw.quantity);
                        }
                    }
                    self.usage.push(record.clone());
                }
            }
            LedgerEvent::StockWithdrawn(e) => {
                for draw in &e.draws {
                    if let Some(&i) = self.lot_index.get(&draw.lot_id) {
                        self.lots[i].draw(draw.quantity);
                    }
                }
                self.withdrawals.push(Withdrawal {
                    sequence: self.withdrawals.len() as u64 + 1,
                    ingredient_id: e.ingredient_id,
                    quantity: e.quantity,
                    reason: e.reason.clone(),
                    withdrawn_at: e.occurred_at,
                    draws: e.draws.clone(),
                });
            }
            LedgerEvent::LotDiscarded(e) => {
                if let Some(&i) = self.lot_index.get(&e.lot_id) {
                    self.lots[i].draw(e.quantity);
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::RegisterIngredient(cmd) => self.handle_register(cmd),
            LedgerCommand::ReceiveLot(cmd) => self.handle_receive(cmd),
            LedgerCommand::SetThreshold(cmd) => self.handle_set_threshold(cmd),
            LedgerCommand::ReserveConsumption(cmd) => self.handle_reserve(cmd),
            LedgerCommand::WithdrawStock(cmd) => self.handle_withdraw(cmd),
            LedgerCommand::DiscardLot(cmd) => self.handle_discard(cmd),
        }
    }
}

impl InventoryLedger {
    fn ensure_ingredient(&self, ingredient_id: IngredientId) -> Result<&Ingredient, DomainError> {
        self.ingredient(ingredient_id)
            .ok_or_else(|| DomainError::not_found(format!("ingredient {ingredient_id}")))
    }

    fn handle_register(&self, cmd: &RegisterIngredient) -> Result<Vec<LedgerEvent>, LedgerError> {
        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("ingredient name cannot be empty").into());
        }
        let unit = cmd.unit.trim();
        if unit.is_empty() {
            return Err(DomainError::validation("unit of measure cannot be empty").into());
        }
        if self.ingredient_index.contains_key(&cmd.ingredient_id) {
            return Err(DomainError::conflict("ingredient already registered").into());
        }
        if self
            .ingredients
            .iter()
            .any(|i| i.name().eq_ignore_ascii_case(name))
        {
            return Err(DomainError::conflict(format!("ingredient named '{name}' already exists")).into());
        }

        Ok(vec![LedgerEvent::IngredientRegistered(IngredientRegistered {
            ingredient_id: cmd.ingredient_id,
            name: name.to_string(),
            unit: unit.to_string(),
            threshold: cmd.threshold,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_receive(&self, cmd: &ReceiveLot) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.ensure_ingredient(cmd.ingredient_id)?;
        if self.lot_index.contains_key(&cmd.lot_id) {
            return Err(DomainError::conflict("lot already received").into());
        }
        if cmd.quantity.is_zero() {
            return Err(DomainError::validation("received quantity must be positive").into());
        }
        let location = cmd.storage_location.trim();
        if location.is_empty() {
            return Err(DomainError::validation("storage location cannot be empty").into());
        }
        // Every per-ingredient sum is bounded by the total received.
        if self
            .total_received(cmd.ingredient_id)
            .checked_add(cmd.quantity)
            .is_none()
        {
            return Err(DomainError::validation(format!(
                "receiving {} would overflow the stock total of ingredient {}",
                cmd.quantity, cmd.ingredient_id
            ))
            .into());
        }

        Ok(vec![LedgerEvent::LotReceived(LotReceived {
            lot_id: cmd.lot_id,
            ingredient_id: cmd.ingredient_id,
            quantity: cmd.quantity,
            expiry_date: cmd.expiry_date,
            storage_location: location.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_threshold(&self, cmd: &SetThreshold) -> Result<Vec<LedgerEvent>, LedgerError> {
        let ingredient = self.ensure_ingredient(cmd.ingredient_id)?;
        if ingredient.threshold() == cmd.threshold {
            return Ok(vec![]);
        }

        Ok(vec![LedgerEvent::ThresholdChanged(ThresholdChanged {
            ingredient_id: cmd.ingredient_id,
            previous: ingredient.threshold(),
            threshold: cmd.threshold,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_discard(&self, cmd: &DiscardLot) -> Result<Vec<LedgerEvent>, LedgerError> {
        let lot = self
            .lot(cmd.lot_id)
            .ok_or_else(|| DomainError::not_found(format!("lot {}", cmd.lot_id)))?;
        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("discard reason cannot be empty").into());
        }
        if lot.is_depleted() {
            return Err(DomainError::invariant("lot is already depleted").into());
        }

        Ok(vec![LedgerEvent::LotDiscarded(LotDiscarded {
            lot_id: cmd.lot_id,
            ingredient_id: lot.ingredient_id(),
            quantity: lot.remaining(),
            reason: cmd.reason.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_withdraw(&self, cmd: &WithdrawStock) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.ensure_ingredient(cmd.ingredient_id)?;
        if cmd.quantity.is_zero() {
            return Err(DomainError::validation("withdrawn quantity must be positive").into());
        }
        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("withdrawal reason cannot be empty").into());
        }
        self.ensure_available(cmd.ingredient_id, cmd.quantity)?;

        let draws = self.plan_draws(cmd.ingredient_id, cmd.quantity, &mut HashMap::new())?;

        Ok(vec![LedgerEvent::StockWithdrawn(StockWithdrawn {
            ingredient_id: cmd.ingredient_id,
            quantity: cmd.quantity,
            reason: reason.to_string(),
            draws,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn ensure_available(&self, ingredient_id: IngredientId, required: Quantity) -> Result<(), LedgerError> {
        let available = self.available(ingredient_id);
        if required > available {
            let name = self.ensure_ingredient(ingredient_id)?.name().to_string();
            return Err(InsufficientStock {
                ingredient: ingredient_id,
                name,
                required,
                available,
            }
            .into());
        }
        Ok(())
    }

    /// Draws covering `quantity`, earliest expiry first, against the scratch
    /// remainders in `left` (lots not yet in `left` start at their remaining).
    fn plan_draws(
        &self,
        ingredient_id: IngredientId,
        quantity: Quantity,
        left: &mut HashMap<LotId, Quantity>,
    ) -> Result<Vec<LotDraw>, LedgerError> {
        let mut outstanding = quantity;
        let mut draws = Vec::new();

        for lot in self.lots(ingredient_id) {
            if outstanding.is_zero() {
                break;
            }
            let on_hand = *left.entry(lot.id_typed()).or_insert(lot.remaining());
            if on_hand.is_zero() {
                continue;
            }
            let take = on_hand.min(outstanding);
            left.insert(lot.id_typed(), on_hand.saturating_sub(take));
            outstanding = outstanding.saturating_sub(take);
            draws.push(LotDraw {
                lot_id: lot.id_typed(),
                quantity: take,
            });
        }

        if !outstanding.is_zero() {
            return Err(DomainError::invariant("lot remainders disagree with available total").into());
        }
        Ok(draws)
    }

    fn handle_reserve(&self, cmd: &ReserveConsumption) -> Result<Vec<LedgerEvent>, LedgerError> {
        if cmd.requirements.is_empty() {
            return Err(DomainError::validation("reservation needs at least one requirement").into());
        }
        if self.usage.iter().any(|r| r.order_id == cmd.order_id) {
            return Err(DomainError::conflict(format!(
                "consumption already recorded for order {}",
                cmd.order_id
            ))
            .into());
        }

        // Totals per ingredient and per (ingredient, menu item), first appearance first.
        let mut totals: Vec<(IngredientId, Quantity)> = Vec::new();
        let mut attributed: Vec<(IngredientId, MenuItemId, Quantity)> = Vec::new();
        for req in &cmd.requirements {
            if req.quantity.is_zero() {
                return Err(DomainError::validation("required quantity must be positive").into());
            }
            self.ensure_ingredient(req.ingredient_id)?;

            let overflow = || {
                LedgerError::from(DomainError::validation(format!(
                    "required quantity of ingredient {} overflows the quantity range",
                    req.ingredient_id
                )))
            };
            match totals.iter_mut().find(|(id, _)| *id == req.ingredient_id) {
                Some((_, total)) => *total = total.checked_add(req.quantity).ok_or_else(overflow)?,
                None => totals.push((req.ingredient_id, req.quantity)),
            }
            match attributed
                .iter_mut()
                .find(|(i, m, _)| *i == req.ingredient_id && *m == req.menu_item_id)
            {
                Some((_, _, total)) => *total = total.checked_add(req.quantity).ok_or_else(overflow)?,
                None => attributed.push((req.ingredient_id, req.menu_item_id, req.quantity)),
            }
        }

        // Check every ingredient before planning a single draw.
        for &(ingredient_id, required) in &totals {
            self.ensure_available(ingredient_id, required)?;
        }

        // Plan draws against scratch remainders; lots are untouched until apply.
        let mut left: HashMap<LotId, Quantity> = HashMap::new();
        let mut records = Vec::with_capacity(attributed.len());
        let mut sequence = self.usage.len() as u64;

        for (ingredient_id, menu_item_id, quantity) in attributed {
            let draws = self.plan_draws(ingredient_id, quantity, &mut left)?;

            sequence += 1;
            records.push(UsageRecord {
                sequence,
                ingredient_id,
                menu_item_id,
                order_id: cmd.order_id,
                quantity,
                used_at: cmd.occurred_at,
                draws,
            });
        }

        Ok(vec![LedgerEvent::ConsumptionRecorded(ConsumptionRecorded {
            order_id: cmd.order_id,
            records,
            occurred_at: cmd.occurred_at,
        })])
    }
}
