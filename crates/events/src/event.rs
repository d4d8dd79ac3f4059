use chrono::{DateTime, Utc};

use flowplan_core::OrganizationId;

/// A domain-agnostic event.
///
/// Events are:
/// - **immutable** (treat them as facts about already-persisted state)
/// - **versioned** (schema evolution)
/// - **routed by subject** (`{service}.{resource}.{action}`)
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "buffer.calculated").
    fn event_type(&self) -> &'static str;

    /// Routing subject (e.g. "ddmrp.buffer.calculated").
    fn subject(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// Organization the event belongs to.
    fn organization_id(&self) -> OrganizationId;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
