use serde::{Deserialize, Serialize};

use larder_core::{Entity, IngredientId, Quantity};

/// An ingredient tracked by the ledger.
///
/// Identity, name and unit are fixed at registration. The low-stock threshold
/// can only change through `SetThreshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    id: IngredientId,
    name: String,
    unit: String,
    threshold: Quantity,
}

impl Ingredient {
    pub(crate) fn new(id: IngredientId, name: String, unit: String, threshold: Quantity) -> Self {
        Self {
            id,
            name,
            unit,
            threshold,
        }
    }

    pub fn id_typed(&self) -> IngredientId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unit of measure (e.g. "kg", "l", "pcs").
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Quantity at or below which the ingredient is reported as low-stock.
    pub fn threshold(&self) -> Quantity {
        self.threshold
    }

    pub(crate) fn set_threshold(&mut self, threshold: Quantity) {
        self.threshold = threshold;
    }
}

impl Entity for Ingredient {
    type Id = IngredientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
