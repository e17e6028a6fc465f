use std::sync::{Arc, Mutex};

use super::monitor::LowStockAlert;

/// Delivery seam for low-stock alerts (pager, email, kitchen display).
pub trait LowStockNotifier: Send + Sync {
    fn notify(&self, alert: &LowStockAlert);
}

impl<N> LowStockNotifier for Arc<N>
where
    N: LowStockNotifier + ?Sized,
{
    fn notify(&self, alert: &LowStockAlert) {
        (**self).notify(alert)
    }
}

/// Logs each alert as a `warn` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl LowStockNotifier for TracingNotifier {
    fn notify(&self, alert: &LowStockAlert) {
        tracing::warn!(
            ingredient_id = %alert.ingredient_id,
            ingredient = %alert.name,
            current = %alert.current,
            threshold = %alert.threshold,
            unit = %alert.unit,
            "low stock"
        );
    }
}

/// Collects alerts in memory (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryNotifier {
    alerts: Mutex<Vec<LowStockAlert>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<LowStockAlert> {
        match self.alerts.lock() {
            Ok(alerts) => alerts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LowStockNotifier for InMemoryNotifier {
    fn notify(&self, alert: &LowStockAlert) {
        let mut alerts = match self.alerts.lock() {
            Ok(alerts) => alerts,
            Err(poisoned) => poisoned.into_inner(),
        };
        alerts.push(alert.clone());
    }
}
