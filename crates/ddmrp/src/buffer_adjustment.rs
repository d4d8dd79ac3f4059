//! Time-boxed multipliers on computed zone sizes (planned events, spikes, seasons).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flowplan_core::{
    AdjustmentId, BufferId, DomainError, DomainResult, Entity, OrganizationId, ProductId, UserId,
};
use flowplan_events::OrganizationScoped;

use crate::window::ActiveWindow;
use crate::zone::ZoneSizes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferAdjustmentType {
    ZoneFactor,
    PlannedEvent,
    SpikeManagement,
    SeasonalPrepare,
}

impl BufferAdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferAdjustmentType::ZoneFactor => "zone_factor",
            BufferAdjustmentType::PlannedEvent => "planned_event",
            BufferAdjustmentType::SpikeManagement => "spike_management",
            BufferAdjustmentType::SeasonalPrepare => "seasonal_prepare",
        }
    }
}

impl core::str::FromStr for BufferAdjustmentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zone_factor" => Ok(BufferAdjustmentType::ZoneFactor),
            "planned_event" => Ok(BufferAdjustmentType::PlannedEvent),
            "spike_management" => Ok(BufferAdjustmentType::SpikeManagement),
            "seasonal_prepare" => Ok(BufferAdjustmentType::SeasonalPrepare),
            other => Err(DomainError::validation(format!(
                "invalid adjustment type: {other}"
            ))),
        }
    }
}

/// Zone(s) a buffer adjustment scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneTarget {
    Red,
    Yellow,
    Green,
    All,
}

impl ZoneTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneTarget::Red => "red",
            ZoneTarget::Yellow => "yellow",
            ZoneTarget::Green => "green",
            ZoneTarget::All => "all",
        }
    }
}

impl core::str::FromStr for ZoneTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "red" => Ok(ZoneTarget::Red),
            "yellow" => Ok(ZoneTarget::Yellow),
            "green" => Ok(ZoneTarget::Green),
            "all" => Ok(ZoneTarget::All),
            other => Err(DomainError::validation(format!("invalid target zone: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBufferAdjustment {
    pub buffer_id: BufferId,
    pub product_id: ProductId,
    pub organization_id: OrganizationId,
    pub adjustment_type: BufferAdjustmentType,
    pub target_zone: ZoneTarget,
    pub factor: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
    pub created_by: UserId,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BufferAdjustmentChanges {
    pub adjustment_type: Option<BufferAdjustmentType>,
    pub target_zone: Option<ZoneTarget>,
    pub factor: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferAdjustment {
    pub id: AdjustmentId,
    pub buffer_id: BufferId,
    pub product_id: ProductId,
    pub organization_id: OrganizationId,
    pub adjustment_type: BufferAdjustmentType,
    pub target_zone: ZoneTarget,
    pub factor: f64,
    pub window: ActiveWindow,
    pub reason: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl BufferAdjustment {
    pub fn create(
        id: AdjustmentId,
        input: NewBufferAdjustment,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let adj = Self {
            id,
            buffer_id: input.buffer_id,
            product_id: input.product_id,
            organization_id: input.organization_id,
            adjustment_type: input.adjustment_type,
            target_zone: input.target_zone,
            factor: input.factor,
            window: ActiveWindow::new(input.start_date, input.end_date)?,
            reason: input.reason,
            created_by: input.created_by.require("created_by")?,
            created_at: now,
        };
        adj.validate()?;
        Ok(adj)
    }

    pub fn revise(&self, changes: BufferAdjustmentChanges) -> DomainResult<Self> {
        let start = changes.start_date.unwrap_or(self.window.start());
        let end = changes.end_date.unwrap_or(self.window.end());

        let next = Self {
            adjustment_type: changes.adjustment_type.unwrap_or(self.adjustment_type),
            target_zone: changes.target_zone.unwrap_or(self.target_zone),
            factor: changes.factor.unwrap_or(self.factor),
            window: ActiveWindow::new(start, end)?,
            reason: changes.reason.unwrap_or_else(|| self.reason.clone()),
            ..self.clone()
        };
        next.validate()?;
        Ok(next)
    }

    pub fn validate(&self) -> DomainResult<()> {
        self.buffer_id.require("buffer_id")?;
        self.product_id.require("product_id")?;
        self.organization_id.require("organization_id")?;
        if !self.factor.is_finite() || self.factor <= 0.0 {
            return Err(DomainError::validation("factor must be greater than 0"));
        }
        if self.reason.trim().is_empty() {
            return Err(DomainError::validation("reason is required"));
        }
        Ok(())
    }

    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.window.contains(day)
    }
}

impl OrganizationScoped for BufferAdjustment {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

impl Entity for BufferAdjustment {
    type Id = AdjustmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Scale zone sizes by every adjustment, each on its target zone(s).
///
/// Only `red_zone`, `yellow_zone` and `green_zone` move; the red base/safety
/// split keeps its unadjusted values.
pub fn apply_buffer_adjustments(zones: &ZoneSizes, active: &[BufferAdjustment]) -> ZoneSizes {
    let mut out = *zones;
    for adj in active {
        match adj.target_zone {
            ZoneTarget::Red => out.red_zone *= adj.factor,
            ZoneTarget::Yellow => out.yellow_zone *= adj.factor,
            ZoneTarget::Green => out.green_zone *= adj.factor,
            ZoneTarget::All => {
                out.red_zone *= adj.factor;
                out.yellow_zone *= adj.factor;
                out.green_zone *= adj.factor;
            }
        }
    }
    out
}
