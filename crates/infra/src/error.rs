use thiserror::Error;

use larder_auth::AuthzError;
use larder_core::DomainError;
use larder_inventory::{InsufficientStock, LedgerError};

use crate::ledger_store::StoreError;

/// Failure of an infra-level ledger operation (submission, stock handling).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Unauthorized(#[from] AuthzError),
}

impl ServiceError {
    pub fn insufficient_stock(&self) -> Option<&InsufficientStock> {
        match self {
            ServiceError::Ledger(err) => err.insufficient_stock(),
            _ => None,
        }
    }
}
