use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use flowplan_core::OrganizationId;

use crate::event::Event;

/// Schema version stamped on every envelope.
pub const SCHEMA_VERSION: &str = "1.0";

/// Envelope for an event, carrying organization and routing metadata.
///
/// This is the unit handed to an event bus.
///
/// Notes:
/// - **Multi-tenancy** is carried by `organization_id`.
/// - `subject` is the routing key; `event_type` names the payload schema.
/// - `correlation_id` defaults to the event id and links related events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    id: Uuid,
    subject: String,
    correlation_id: Uuid,
    organization_id: OrganizationId,
    source: String,
    #[serde(rename = "type")]
    event_type: String,
    schema_version: String,
    timestamp: DateTime<Utc>,
    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        id: Uuid,
        subject: impl Into<String>,
        organization_id: OrganizationId,
        source: impl Into<String>,
        event_type: impl Into<String>,
        timestamp: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            id,
            subject: subject.into(),
            correlation_id: id,
            organization_id,
            source: source.into(),
            event_type: event_type.into(),
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp,
            payload,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl EventEnvelope<JsonValue> {
    /// Serialize a typed event into a JSON envelope, copying its routing metadata.
    pub fn seal<E>(event: &E, source: &str) -> Result<Self, serde_json::Error>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event)?;
        Ok(Self::new(
            Uuid::now_v7(),
            event.subject(),
            event.organization_id(),
            source,
            event.event_type(),
            event.occurred_at(),
            payload,
        ))
    }

    /// Decode the JSON payload back into a typed event.
    pub fn open<E>(&self) -> Result<E, serde_json::Error>
    where
        E: Event + serde::de::DeserializeOwned,
    {
        serde_json::from_value(self.payload.clone())
    }
}
