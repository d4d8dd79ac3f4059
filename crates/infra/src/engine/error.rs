use flowplan_core::DomainError;

use crate::catalog::CatalogError;
use crate::publisher::PublishError;
use crate::store::StoreError;

/// Error returned by every engine operation.
///
/// - `Validation`: caller input is wrong; retrying the same call fails again.
/// - `NotFound`: a required record (product, profile, supplier, ADU, buffer) is missing.
/// - `Conflict`: the record already exists (duplicate buffer, same-day ADU).
/// - `Internal`: a store, catalog or bus failed; the message names the failing step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        EngineError::NotFound(what.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        EngineError::Internal(msg.into())
    }

    /// Map a store failure, prefixing internal errors with the step that failed.
    pub fn store(step: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => EngineError::NotFound(what),
            StoreError::Conflict(msg) => EngineError::Conflict(msg),
            // Records of other organizations are reported as absent.
            StoreError::OrganizationIsolation => {
                EngineError::NotFound(format!("{step}: record not found"))
            }
            StoreError::Storage(msg) => EngineError::Internal(format!("{step}: {msg}")),
        }
    }

    pub fn catalog(step: &str, err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(what) => EngineError::NotFound(what),
            CatalogError::Unavailable(msg) => EngineError::Internal(format!("{step}: {msg}")),
        }
    }

    pub fn publish(step: &str, err: PublishError) -> Self {
        EngineError::Internal(format!("{step}: {err}"))
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                EngineError::Validation(msg)
            }
            DomainError::NotFound(what) => EngineError::NotFound(what),
            DomainError::InvariantViolation(msg) => EngineError::Internal(msg),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        EngineError::store("store", value)
    }
}

impl From<CatalogError> for EngineError {
    fn from(value: CatalogError) -> Self {
        EngineError::catalog("catalog", value)
    }
}

impl From<PublishError> for EngineError {
    fn from(value: PublishError) -> Self {
        EngineError::publish("publish", value)
    }
}
