//! Persistence ports of the buffer engine and their in-memory adapters.
//!
//! One narrow trait per entity. Every lookup is organization-scoped: asking for
//! a record through another organization is an isolation error, never a hit.

mod adjustments;
mod adu;
mod buffer;
mod history;
mod table;

pub use adjustments::{
    BufferAdjustmentStore, DemandAdjustmentStore, InMemoryBufferAdjustmentStore,
    InMemoryDemandAdjustmentStore,
};
pub use adu::{AduStore, InMemoryAduStore};
pub use buffer::{BufferStore, InMemoryBufferStore};
pub use history::{BufferHistoryStore, InMemoryBufferHistoryStore};

/// Store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("organization isolation violation")]
    OrganizationIsolation,
    #[error("storage error: {0}")]
    Storage(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
