//! Events published by the buffer engine.
//!
//! Each payload type implements [`Event`] on its own so consumers can open an
//! envelope straight into the concrete type named by its `type` field.
//! [`DdmrpEvent`] groups them for publishers; it serializes untagged (the
//! envelope already carries the type), and [`DdmrpEvent::from_envelope`] is the
//! typed way back.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use flowplan_core::{AdjustmentId, AduCalculationId, BufferId, OrganizationId, ProductId};
use flowplan_events::{Event, EventEnvelope, subjects};

use crate::adu::{AduCalculation, AduMethod};
use crate::buffer::Buffer;
use crate::demand_adjustment::{DemandAdjustment, DemandAdjustmentType};
use crate::zone::{AlertLevel, Zone};

pub const BUFFER_CALCULATED: &str = "buffer.calculated";
pub const BUFFER_STATUS_CHANGED: &str = "buffer.status_changed";
pub const BUFFER_ALERT_TRIGGERED: &str = "buffer.alert_triggered";
pub const FAD_CREATED: &str = "fad.created";
pub const FAD_UPDATED: &str = "fad.updated";
pub const FAD_DELETED: &str = "fad.deleted";
pub const ADU_CALCULATED: &str = "adu.calculated";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferCalculated {
    pub organization_id: OrganizationId,
    pub buffer_id: BufferId,
    pub product_id: ProductId,
    pub cpd: f64,
    pub ltd_days: u32,
    pub red_base: f64,
    pub red_safety: f64,
    pub red_zone: f64,
    pub yellow_zone: f64,
    pub green_zone: f64,
    pub top_of_red: f64,
    pub top_of_yellow: f64,
    pub top_of_green: f64,
    pub on_hand: f64,
    pub on_order: f64,
    pub qualified_demand: f64,
    pub net_flow_position: f64,
    pub zone: Zone,
    pub alert_level: AlertLevel,
    pub occurred_at: DateTime<Utc>,
}

impl BufferCalculated {
    pub fn from_buffer(buffer: &Buffer, occurred_at: DateTime<Utc>) -> Self {
        let zones = buffer.zones();
        let thresholds = buffer.thresholds();
        let flow = buffer.flow();
        Self {
            organization_id: buffer.organization_id(),
            buffer_id: buffer.id_typed(),
            product_id: buffer.product_id(),
            cpd: buffer.cpd(),
            ltd_days: buffer.ltd_days(),
            red_base: zones.red_base,
            red_safety: zones.red_safety,
            red_zone: zones.red_zone,
            yellow_zone: zones.yellow_zone,
            green_zone: zones.green_zone,
            top_of_red: thresholds.top_of_red,
            top_of_yellow: thresholds.top_of_yellow,
            top_of_green: thresholds.top_of_green,
            on_hand: flow.on_hand,
            on_order: flow.on_order,
            qualified_demand: flow.qualified_demand,
            net_flow_position: buffer.net_flow_position(),
            zone: buffer.zone(),
            alert_level: buffer.alert_level(),
            occurred_at,
        }
    }
}

/// Zone transition. `previous_zone` is `None` for a buffer's first sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferStatusChanged {
    pub organization_id: OrganizationId,
    pub buffer_id: BufferId,
    pub product_id: ProductId,
    pub previous_zone: Option<Zone>,
    pub zone: Zone,
    pub alert_level: AlertLevel,
    pub net_flow_position: f64,
    pub top_of_red: f64,
    pub top_of_yellow: f64,
    pub top_of_green: f64,
    pub occurred_at: DateTime<Utc>,
}

impl BufferStatusChanged {
    pub fn from_buffer(
        buffer: &Buffer,
        previous_zone: Option<Zone>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let thresholds = buffer.thresholds();
        Self {
            organization_id: buffer.organization_id(),
            buffer_id: buffer.id_typed(),
            product_id: buffer.product_id(),
            previous_zone,
            zone: buffer.zone(),
            alert_level: buffer.alert_level(),
            net_flow_position: buffer.net_flow_position(),
            top_of_red: thresholds.top_of_red,
            top_of_yellow: thresholds.top_of_yellow,
            top_of_green: thresholds.top_of_green,
            occurred_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferAlertTriggered {
    pub organization_id: OrganizationId,
    pub buffer_id: BufferId,
    pub product_id: ProductId,
    pub zone: Zone,
    pub alert_level: AlertLevel,
    pub net_flow_position: f64,
    pub penetration: Option<f64>,
    /// Suggested top-up to top-of-green, only for red-zone buffers.
    pub replenishment_qty: Option<f64>,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl BufferAlertTriggered {
    pub fn from_buffer(buffer: &Buffer, occurred_at: DateTime<Utc>) -> Self {
        let message = match buffer.zone() {
            Zone::BelowRed => format!(
                "buffer is below red: net flow position {:.2} is at or below zero",
                buffer.net_flow_position()
            ),
            zone => format!(
                "buffer is in {zone} zone: net flow position {:.2} below top of red {:.2}",
                buffer.net_flow_position(),
                buffer.thresholds().top_of_red
            ),
        };
        Self {
            organization_id: buffer.organization_id(),
            buffer_id: buffer.id_typed(),
            product_id: buffer.product_id(),
            zone: buffer.zone(),
            alert_level: buffer.alert_level(),
            net_flow_position: buffer.net_flow_position(),
            penetration: buffer.penetration(),
            replenishment_qty: buffer.replenishment_quantity(),
            message,
            occurred_at,
        }
    }
}

/// FAD lifecycle payload shared by create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FadCreated {
    pub organization_id: OrganizationId,
    pub adjustment_id: AdjustmentId,
    pub product_id: ProductId,
    pub adjustment_type: DemandAdjustmentType,
    pub factor: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

impl FadCreated {
    pub fn from_adjustment(fad: &DemandAdjustment, occurred_at: DateTime<Utc>) -> Self {
        Self {
            organization_id: fad.organization_id,
            adjustment_id: fad.id,
            product_id: fad.product_id,
            adjustment_type: fad.adjustment_type,
            factor: fad.factor,
            start_date: fad.window.start_day(),
            end_date: fad.window.end_day(),
            reason: fad.reason.clone(),
            occurred_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FadUpdated(pub FadCreated);

impl FadUpdated {
    pub fn from_adjustment(fad: &DemandAdjustment, occurred_at: DateTime<Utc>) -> Self {
        Self(FadCreated::from_adjustment(fad, occurred_at))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FadDeleted {
    pub organization_id: OrganizationId,
    pub adjustment_id: AdjustmentId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AduCalculated {
    pub organization_id: OrganizationId,
    pub calculation_id: AduCalculationId,
    pub product_id: ProductId,
    pub calculation_date: NaiveDate,
    pub adu_value: f64,
    pub method: AduMethod,
    pub period_days: u32,
    pub occurred_at: DateTime<Utc>,
}

impl AduCalculated {
    pub fn from_calculation(calc: &AduCalculation) -> Self {
        Self {
            organization_id: calc.organization_id,
            calculation_id: calc.id,
            product_id: calc.product_id,
            calculation_date: calc.calculation_date,
            adu_value: calc.adu_value,
            method: calc.method,
            period_days: calc.period_days,
            occurred_at: calc.created_at,
        }
    }
}

macro_rules! impl_event {
    ($t:ty, $event_type:expr, $subject:expr, |$e:ident| $org:expr, $at:expr) => {
        impl Event for $t {
            fn event_type(&self) -> &'static str {
                $event_type
            }

            fn subject(&self) -> &'static str {
                $subject
            }

            fn version(&self) -> u32 {
                1
            }

            fn organization_id(&self) -> OrganizationId {
                let $e = self;
                $org
            }

            fn occurred_at(&self) -> DateTime<Utc> {
                let $e = self;
                $at
            }
        }
    };
}

impl_event!(BufferCalculated, BUFFER_CALCULATED, subjects::BUFFER_CALCULATED, |e| e.organization_id, e.occurred_at);
impl_event!(BufferStatusChanged, BUFFER_STATUS_CHANGED, subjects::BUFFER_STATUS_CHANGED, |e| e.organization_id, e.occurred_at);
impl_event!(BufferAlertTriggered, BUFFER_ALERT_TRIGGERED, subjects::BUFFER_ALERT_TRIGGERED, |e| e.organization_id, e.occurred_at);
impl_event!(FadCreated, FAD_CREATED, subjects::FAD_CREATED, |e| e.organization_id, e.occurred_at);
impl_event!(FadUpdated, FAD_UPDATED, subjects::FAD_UPDATED, |e| e.0.organization_id, e.0.occurred_at);
impl_event!(FadDeleted, FAD_DELETED, subjects::FAD_DELETED, |e| e.organization_id, e.occurred_at);
impl_event!(AduCalculated, ADU_CALCULATED, subjects::ADU_CALCULATED, |e| e.organization_id, e.occurred_at);

/// Every event the engine publishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DdmrpEvent {
    BufferCalculated(BufferCalculated),
    BufferStatusChanged(BufferStatusChanged),
    BufferAlertTriggered(BufferAlertTriggered),
    FadCreated(FadCreated),
    FadUpdated(FadUpdated),
    FadDeleted(FadDeleted),
    AduCalculated(AduCalculated),
}

macro_rules! delegate {
    ($self:ident, |$e:ident| $body:expr) => {
        match $self {
            DdmrpEvent::BufferCalculated($e) => $body,
            DdmrpEvent::BufferStatusChanged($e) => $body,
            DdmrpEvent::BufferAlertTriggered($e) => $body,
            DdmrpEvent::FadCreated($e) => $body,
            DdmrpEvent::FadUpdated($e) => $body,
            DdmrpEvent::FadDeleted($e) => $body,
            DdmrpEvent::AduCalculated($e) => $body,
        }
    };
}

impl Event for DdmrpEvent {
    fn event_type(&self) -> &'static str {
        delegate!(self, |e| e.event_type())
    }

    fn subject(&self) -> &'static str {
        delegate!(self, |e| e.subject())
    }

    fn version(&self) -> u32 {
        delegate!(self, |e| e.version())
    }

    fn organization_id(&self) -> OrganizationId {
        delegate!(self, |e| e.organization_id())
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        delegate!(self, |e| e.occurred_at())
    }
}

impl DdmrpEvent {
    /// Decode a sealed envelope using its `type` field.
    pub fn from_envelope(envelope: &EventEnvelope<JsonValue>) -> Result<Self, serde_json::Error> {
        Ok(match envelope.event_type() {
            BUFFER_CALCULATED => DdmrpEvent::BufferCalculated(envelope.open()?),
            BUFFER_STATUS_CHANGED => DdmrpEvent::BufferStatusChanged(envelope.open()?),
            BUFFER_ALERT_TRIGGERED => DdmrpEvent::BufferAlertTriggered(envelope.open()?),
            FAD_CREATED => DdmrpEvent::FadCreated(envelope.open()?),
            FAD_UPDATED => DdmrpEvent::FadUpdated(envelope.open()?),
            FAD_DELETED => DdmrpEvent::FadDeleted(envelope.open()?),
            ADU_CALCULATED => DdmrpEvent::AduCalculated(envelope.open()?),
            other => {
                return Err(serde::de::Error::custom(format!(
                    "unknown event type: {other}"
                )));
            }
        })
    }
}

impl From<BufferCalculated> for DdmrpEvent {
    fn from(e: BufferCalculated) -> Self {
        DdmrpEvent::BufferCalculated(e)
    }
}

impl From<BufferStatusChanged> for DdmrpEvent {
    fn from(e: BufferStatusChanged) -> Self {
        DdmrpEvent::BufferStatusChanged(e)
    }
}

impl From<BufferAlertTriggered> for DdmrpEvent {
    fn from(e: BufferAlertTriggered) -> Self {
        DdmrpEvent::BufferAlertTriggered(e)
    }
}

impl From<FadCreated> for DdmrpEvent {
    fn from(e: FadCreated) -> Self {
        DdmrpEvent::FadCreated(e)
    }
}

impl From<FadUpdated> for DdmrpEvent {
    fn from(e: FadUpdated) -> Self {
        DdmrpEvent::FadUpdated(e)
    }
}

impl From<FadDeleted> for DdmrpEvent {
    fn from(e: FadDeleted) -> Self {
        DdmrpEvent::FadDeleted(e)
    }
}

impl From<AduCalculated> for DdmrpEvent {
    fn from(e: AduCalculated) -> Self {
        DdmrpEvent::AduCalculated(e)
    }
}
