//! Buffer engine use cases.
//!
//! Each service composes the store, catalog, publisher and clock ports it
//! needs. Services are synchronous request/response operations; the engine
//! takes no locks on buffers, so callers keep at most one recalculation per
//! (product, organization) in flight. Concurrent recalculations of the same
//! product race and the last writer wins.
//!
//! ```text
//! demand history ─▶ AduService ─▶ AduStore
//!                                   │
//! DemandAdjustmentService ──────────┤
//!                                   ▼
//!               BufferRecalculator (catalog + zones + buffer adjustments)
//!                                   │
//!                 BufferStore + BufferHistoryStore ─▶ EventPublisher
//!                                   ▲
//! NetFlowUpdater ───────────────────┘     BufferQueries (read-only)
//! ```

use std::sync::Arc;

use crate::catalog::CatalogClient;
use crate::clock::Clock;
use crate::publisher::EventPublisher;
use crate::store::{
    AduStore, BufferAdjustmentStore, BufferHistoryStore, BufferStore, DemandAdjustmentStore,
};

pub mod adu;
pub mod buffer_adjustments;
pub mod demand_adjustments;
pub mod error;
pub mod flow;
pub mod queries;
pub mod recalculation;

pub use adu::AduService;
pub use buffer_adjustments::BufferAdjustmentService;
pub use demand_adjustments::DemandAdjustmentService;
pub use error::{EngineError, EngineResult};
pub use flow::{NetFlowUpdate, NetFlowUpdater};
pub use queries::{BufferFilter, BufferQueries};
pub use recalculation::{BatchRecalculationReport, BufferRecalculator, RecalculationOutcome};

/// Collaborators shared by every engine service.
#[derive(Clone)]
pub struct EnginePorts {
    pub buffers: Arc<dyn BufferStore>,
    pub adu: Arc<dyn AduStore>,
    pub demand_adjustments: Arc<dyn DemandAdjustmentStore>,
    pub buffer_adjustments: Arc<dyn BufferAdjustmentStore>,
    pub history: Arc<dyn BufferHistoryStore>,
    pub catalog: Arc<dyn CatalogClient>,
    pub publisher: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
}

impl core::fmt::Debug for EnginePorts {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EnginePorts").finish_non_exhaustive()
    }
}
