use thiserror::Error;

use larder_core::{DomainError, IngredientId, Quantity};

/// A reservation asked for more of an ingredient than all its lots hold.
///
/// Always surfaced to the caller: retrying without new stock cannot succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("insufficient stock of {name} ({ingredient}): required {required}, available {available}")]
pub struct InsufficientStock {
    pub ingredient: IngredientId,
    pub name: String,
    pub required: Quantity,
    pub available: Quantity,
}

/// Failure of a ledger command.
///
/// `InsufficientStock` is the only business outcome; everything else is a
/// caller contract violation (unknown ingredient, zero quantity, duplicate
/// id) rejected before any state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    InsufficientStock(#[from] InsufficientStock),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl LedgerError {
    pub fn insufficient_stock(&self) -> Option<&InsufficientStock> {
        match self {
            LedgerError::InsufficientStock(e) => Some(e),
            LedgerError::Domain(_) => None,
        }
    }
}
