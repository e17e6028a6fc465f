//! Order submission workflow.
//!
//! ```text
//! SubmitOrder
//!   ↓
//! 1. Authorize the acting user (orders.submit)
//!   ↓
//! 2. Decide the order transition (lines present, status Created)
//!   ↓
//! 3. Expand order lines through recipes into requirements
//!   ↓
//! 4. Ledger transaction: reserve consumption, commit (retried on conflict)
//!   ↓
//! 5. Apply the order transition
//! ```
//!
//! The order only moves to `Submitted` once the stock is committed; a
//! rejected reservation leaves both the order and the ledger untouched.

use chrono::{DateTime, Utc};
use larder_auth::{Permission, User, authorize};
use larder_core::{Aggregate, LotId};
use larder_inventory::{DiscardLot, LedgerCommand, ReserveConsumption, Reservation};
use larder_menu::{RecipeBook, expand_lines};
use larder_orders::{Order, OrderCommand, SubmitOrder};

use crate::config::LarderConfig;
use crate::error::ServiceError;
use crate::ledger_store::{LedgerStore, transact};

/// Submits orders against a ledger store.
pub struct OrderSubmission<S, B> {
    store: S,
    recipes: B,
    config: LarderConfig,
}

impl<S, B> OrderSubmission<S, B>
where
    S: LedgerStore,
    B: RecipeBook,
{
    pub fn new(store: S, recipes: B, config: LarderConfig) -> Self {
        Self {
            store,
            recipes,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Submit `order` on behalf of `actor`, consuming its ingredients.
    pub fn submit(
        &self,
        actor: &User,
        order: &mut Order,
        occurred_at: DateTime<Utc>,
    ) -> Result<Reservation, ServiceError> {
        authorize(actor, Permission::SubmitOrder)?;

        let order_id = order.id_typed();
        let submitted = order.handle(&OrderCommand::SubmitOrder(SubmitOrder {
            order_id,
            occurred_at,
        }))?;

        let requirements = expand_lines(&self.recipes, order.portions())?;
        let today = occurred_at.date_naive();

        let result = transact(&self.store, self.config.max_commit_retries, |ledger| {
            let mut events = Vec::new();

            if self.config.skip_expired_lots {
                let expired: Vec<LotId> = ledger
                    .expired_lots(today)
                    .into_iter()
                    .map(|lot| lot.id_typed())
                    .collect();
                for lot_id in expired {
                    events.extend(ledger.execute(&LedgerCommand::DiscardLot(DiscardLot {
                        lot_id,
                        reason: "expired".to_string(),
                        occurred_at,
                    }))?);
                }
            }

            let recorded = ledger.execute(&LedgerCommand::ReserveConsumption(ReserveConsumption {
                order_id,
                requirements: requirements.clone(),
                occurred_at,
            }))?;
            let reservation = Reservation::from_events(order_id, &recorded);
            events.extend(recorded);

            Ok::<_, ServiceError>((reservation, events))
        });

        let reservation = match result {
            Ok(reservation) => reservation,
            Err(err) => {
                if let Some(short) = err.insufficient_stock() {
                    tracing::warn!(
                        order_id = %order_id,
                        ingredient_id = %short.ingredient,
                        ingredient = %short.name,
                        required = %short.required,
                        available = %short.available,
                        "order rejected: insufficient stock"
                    );
                }
                return Err(err);
            }
        };

        for draw in reservation.draws() {
            tracing::debug!(order_id = %order_id, lot_id = %draw.lot_id, quantity = %draw.quantity, "lot drawn");
        }

        for event in &submitted {
            order.apply(event);
        }

        tracing::info!(
            order_id = %order_id,
            usage_records = reservation.records.len(),
            "order submitted"
        );

        Ok(reservation)
    }
}
