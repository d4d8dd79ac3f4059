//! Demand-driven buffer domain (DDMRP).
//!
//! This crate contains the buffer engine's business rules implemented purely as
//! deterministic domain logic (no IO, no storage, no transport):
//!
//! - zone sizing and net-flow-position classification ([`zone`])
//! - the buffer entity and its state transitions ([`buffer`])
//! - average daily usage methods ([`adu`])
//! - time-windowed demand and buffer adjustments ([`demand_adjustment`], [`buffer_adjustment`])
//! - daily history snapshots ([`history`])
//! - read-only catalog inputs ([`catalog`]) and published events ([`events`])

pub mod adu;
pub mod buffer;
pub mod buffer_adjustment;
pub mod catalog;
pub mod demand_adjustment;
pub mod events;
pub mod history;
pub mod window;
pub mod zone;

pub use adu::{AduCalculation, AduConfig, AduMethod, NewAduCalculation};
pub use buffer::{Buffer, BufferSizing, FlowInputs};
pub use buffer_adjustment::{
    BufferAdjustment, BufferAdjustmentChanges, BufferAdjustmentType, NewBufferAdjustment,
    ZoneTarget, apply_buffer_adjustments,
};
pub use catalog::{BufferProfile, Product, ProductSupplier};
pub use demand_adjustment::{
    DemandAdjustment, DemandAdjustmentChanges, DemandAdjustmentType, NewDemandAdjustment,
    apply_adjusted_cpd,
};
pub use events::{
    AduCalculated, BufferAlertTriggered, BufferCalculated, BufferStatusChanged, DdmrpEvent,
    FadCreated, FadDeleted, FadUpdated,
};
pub use history::BufferHistory;
pub use window::ActiveWindow;
pub use zone::{AlertLevel, Thresholds, Zone, ZoneInputs, ZoneSizes, calculate_buffer_zones, net_flow_position};
