use thiserror::Error;

use shopfront_core::DomainError;

use crate::store::StoreError;

/// Error returned by the catalog and fulfilment services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Lock timeout, deadlock or duplicate key. Safe to retry in full.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Conflict(_) | ServiceError::Store(_))
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) | StoreError::Duplicate(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
        }
    }
}
