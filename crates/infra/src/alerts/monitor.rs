use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{IngredientId, LotId, Quantity};
use larder_inventory::LotStatus;

use super::notifier::LowStockNotifier;
use crate::config::LarderConfig;
use crate::ledger_store::{LedgerStore, StoreError};

/// An ingredient found at or below its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockAlert {
    pub ingredient_id: IngredientId,
    pub name: String,
    pub unit: String,
    pub current: Quantity,
    pub threshold: Quantity,
    pub detected_at: DateTime<Utc>,
}

/// A lot in the expiring-stock report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiringLot {
    pub lot_id: LotId,
    pub ingredient_id: IngredientId,
    pub ingredient: String,
    pub remaining: Quantity,
    pub expiry_date: NaiveDate,
    pub storage_location: String,
    /// `Expired` or `ExpiringSoon`.
    pub status: LotStatus,
}

/// Reads one ledger snapshot per pass and pushes what it finds to a notifier.
pub struct ThresholdMonitor<S, N> {
    store: S,
    notifier: N,
    config: LarderConfig,
}

impl<S, N> ThresholdMonitor<S, N>
where
    S: LedgerStore,
    N: LowStockNotifier,
{
    pub fn new(store: S, notifier: N, config: LarderConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Notify every low-stock ingredient, in registration order.
    pub fn check(&self, detected_at: DateTime<Utc>) -> Result<Vec<LowStockAlert>, StoreError> {
        let ledger = self.store.load()?;

        let alerts: Vec<LowStockAlert> = ledger
            .check_thresholds()
            .map(|low| LowStockAlert {
                ingredient_id: low.ingredient.id_typed(),
                name: low.ingredient.name().to_string(),
                unit: low.ingredient.unit().to_string(),
                current: low.current,
                threshold: low.ingredient.threshold(),
                detected_at,
            })
            .collect();

        for alert in &alerts {
            self.notifier.notify(alert);
        }
        Ok(alerts)
    }

    /// Lots with stock left that expired or expire within the warning window.
    pub fn expiring(&self, today: NaiveDate) -> Result<Vec<ExpiringLot>, StoreError> {
        let ledger = self.store.load()?;
        let days = self.config.expiry_warning_days;

        Ok(ledger
            .expiring_lots(today, days)
            .into_iter()
            .map(|lot| ExpiringLot {
                lot_id: lot.id_typed(),
                ingredient_id: lot.ingredient_id(),
                ingredient: ledger
                    .ingredient(lot.ingredient_id())
                    .map(|i| i.name().to_string())
                    .unwrap_or_default(),
                remaining: lot.remaining(),
                expiry_date: lot.expiry_date(),
                storage_location: lot.storage_location().to_string(),
                status: lot.status(today, days),
            })
            .collect())
    }
}
