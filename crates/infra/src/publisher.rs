//! Outbound port for engine events.
//!
//! Events are sealed into JSON envelopes (subject, organization, source, type,
//! schema version) and handed to whatever [`EventBus`] transport is wired in.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use flowplan_ddmrp::DdmrpEvent;
use flowplan_events::{Event, EventBus, EventEnvelope};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("event bus error: {0}")]
    Bus(String),
}

pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DdmrpEvent) -> Result<(), PublishError>;
}

impl<P> EventPublisher for Arc<P>
where
    P: EventPublisher + ?Sized,
{
    fn publish(&self, event: DdmrpEvent) -> Result<(), PublishError> {
        (**self).publish(event)
    }
}

/// Publishes over an envelope bus (in-memory, Redis, ...).
#[derive(Debug)]
pub struct BusEventPublisher<B> {
    bus: B,
    source: String,
}

impl<B> BusEventPublisher<B>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn new(bus: B, source: impl Into<String>) -> Self {
        Self {
            bus,
            source: source.into(),
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B> EventPublisher for BusEventPublisher<B>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn publish(&self, event: DdmrpEvent) -> Result<(), PublishError> {
        let envelope = EventEnvelope::seal(&event, &self.source)?;
        debug!(
            subject = envelope.subject(),
            organization = %envelope.organization_id(),
            event_id = %envelope.id(),
            "publishing event"
        );
        self.bus
            .publish(envelope)
            .map_err(|e| PublishError::Bus(format!("{e:?}")))?;
        debug!(event_type = event.event_type(), "event published");
        Ok(())
    }
}
