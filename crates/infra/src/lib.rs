//! Infrastructure and orchestration for the demand-driven buffer engine.
//!
//! - [`store`]: persistence ports with in-memory adapters
//! - [`catalog`]: read-only product/profile/supplier lookups
//! - [`publisher`]: outbound events over an [`flowplan_events::EventBus`]
//! - [`engine`]: the use cases (ADU, adjustments, recalculation, net flow, queries)
//! - [`scheduler`]: the daily recalculation runner
//! - [`config`]: engine configuration from the environment

pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod event_bus;
pub mod publisher;
pub mod scheduler;
pub mod store;

pub use catalog::{CatalogClient, CatalogError, InMemoryCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{EngineError, EnginePorts, EngineResult};
pub use publisher::{BusEventPublisher, EventPublisher, PublishError};

#[cfg(test)]
mod integration_tests;
