use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{Entity, IngredientId, LotId, Quantity};

/// Lifecycle status of a lot as of a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    Available,
    ExpiringSoon,
    Expired,
    Depleted,
}

/// One received delivery of an ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLot {
    id: LotId,
    ingredient_id: IngredientId,
    received: Quantity,
    remaining: Quantity,
    expiry_date: NaiveDate,
    storage_location: String,
    /// Insertion order within the ledger; FIFO tie-break for equal expiry.
    sequence: u64,
    received_at: DateTime<Utc>,
}

impl StockLot {
    pub(crate) fn new(
        id: LotId,
        ingredient_id: IngredientId,
        quantity: Quantity,
        expiry_date: NaiveDate,
        storage_location: String,
        sequence: u64,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            ingredient_id,
            received: quantity,
            remaining: quantity,
            expiry_date,
            storage_location,
            sequence,
            received_at,
        }
    }

    pub fn id_typed(&self) -> LotId {
        self.id
    }

    pub fn ingredient_id(&self) -> IngredientId {
        self.ingredient_id
    }

    /// Quantity originally received.
    pub fn received(&self) -> Quantity {
        self.received
    }

    /// Quantity still on hand.
    pub fn remaining(&self) -> Quantity {
        self.remaining
    }

    pub fn expiry_date(&self) -> NaiveDate {
        self.expiry_date
    }

    pub fn storage_location(&self) -> &str {
        &self.storage_location
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn is_depleted(&self) -> bool {
        self.remaining.is_zero()
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }

    /// Depletion order: earliest expiry first, then insertion order.
    pub fn fifo_key(&self) -> (NaiveDate, u64) {
        (self.expiry_date, self.sequence)
    }

    /// Status as of `today`, flagging lots expiring within `warning_days`.
    pub fn status(&self, today: NaiveDate, warning_days: u32) -> LotStatus {
        if self.is_depleted() {
            LotStatus::Depleted
        } else if self.is_expired(today) {
            LotStatus::Expired
        } else if self.expiry_date <= warning_horizon(today, warning_days) {
            LotStatus::ExpiringSoon
        } else {
            LotStatus::Available
        }
    }

    pub(crate) fn draw(&mut self, quantity: Quantity) {
        self.remaining = self.remaining.saturating_sub(quantity);
    }
}

impl Entity for StockLot {
    type Id = LotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Last day that counts as "expiring soon" when looking `days` ahead of `today`.
pub(crate) fn warning_horizon(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, d).unwrap()
    }

    fn lot(quantity: u32, expiry: NaiveDate) -> StockLot {
        StockLot::new(
            LotId::new(),
            IngredientId::new(),
            Quantity::units(quantity),
            expiry,
            "walk-in".to_string(),
            1,
            Utc::now(),
        )
    }

    #[test]
    fn status_follows_expiry_and_remaining() {
        let today = day(10);
        assert_eq!(lot(1, day(9)).status(today, 7), LotStatus::Expired);
        assert_eq!(lot(1, day(10)).status(today, 7), LotStatus::ExpiringSoon);
        assert_eq!(lot(1, day(17)).status(today, 7), LotStatus::ExpiringSoon);
        assert_eq!(lot(1, day(18)).status(today, 7), LotStatus::Available);
        assert_eq!(lot(0, day(20)).status(today, 7), LotStatus::Depleted);
    }

    #[test]
    fn draw_never_goes_below_zero() {
        let mut l = lot(2, day(1));
        l.draw(Quantity::units(5));
        assert_eq!(l.remaining(), Quantity::ZERO);
        assert_eq!(l.received(), Quantity::units(2));
    }
}
