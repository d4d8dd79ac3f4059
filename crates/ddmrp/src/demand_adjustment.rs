//! Demand adjustment factors (FAD): time-boxed multipliers on ADU.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flowplan_core::{
    AdjustmentId, DomainError, DomainResult, Entity, OrganizationId, ProductId, UserId,
};
use flowplan_events::OrganizationScoped;

use crate::window::ActiveWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandAdjustmentType {
    Fad,
    Seasonal,
    NewProduct,
    Discontinue,
    Promotion,
}

impl DemandAdjustmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DemandAdjustmentType::Fad => "fad",
            DemandAdjustmentType::Seasonal => "seasonal",
            DemandAdjustmentType::NewProduct => "new_product",
            DemandAdjustmentType::Discontinue => "discontinue",
            DemandAdjustmentType::Promotion => "promotion",
        }
    }
}

impl core::fmt::Display for DemandAdjustmentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DemandAdjustmentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fad" => Ok(DemandAdjustmentType::Fad),
            "seasonal" => Ok(DemandAdjustmentType::Seasonal),
            "new_product" => Ok(DemandAdjustmentType::NewProduct),
            "discontinue" => Ok(DemandAdjustmentType::Discontinue),
            "promotion" => Ok(DemandAdjustmentType::Promotion),
            other => Err(DomainError::validation(format!(
                "invalid adjustment type: {other}"
            ))),
        }
    }
}

/// Input to create a demand adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDemandAdjustment {
    pub product_id: ProductId,
    pub organization_id: OrganizationId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub adjustment_type: DemandAdjustmentType,
    pub factor: f64,
    pub reason: String,
    pub created_by: UserId,
}

/// Fields an update may replace; `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DemandAdjustmentChanges {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub adjustment_type: Option<DemandAdjustmentType>,
    pub factor: Option<f64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandAdjustment {
    pub id: AdjustmentId,
    pub product_id: ProductId,
    pub organization_id: OrganizationId,
    pub window: ActiveWindow,
    pub adjustment_type: DemandAdjustmentType,
    pub factor: f64,
    pub reason: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

fn validate_factor(factor: f64) -> DomainResult<()> {
    if !factor.is_finite() || factor < 0.0 {
        return Err(DomainError::validation("factor must be non-negative"));
    }
    Ok(())
}

fn validate_reason(reason: &str) -> DomainResult<()> {
    if reason.trim().is_empty() {
        return Err(DomainError::validation("reason is required"));
    }
    Ok(())
}

impl DemandAdjustment {
    pub fn create(
        id: AdjustmentId,
        input: NewDemandAdjustment,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let product_id = input.product_id.require("product_id")?;
        let organization_id = input.organization_id.require("organization_id")?;
        let created_by = input.created_by.require("created_by")?;
        validate_factor(input.factor)?;
        let window = ActiveWindow::new(input.start_date, input.end_date)?;
        validate_reason(&input.reason)?;

        Ok(Self {
            id,
            product_id,
            organization_id,
            window,
            adjustment_type: input.adjustment_type,
            factor: input.factor,
            reason: input.reason,
            created_by,
            created_at: now,
        })
    }

    /// Apply `changes` on a copy and re-validate the result.
    pub fn revise(&self, changes: DemandAdjustmentChanges) -> DomainResult<Self> {
        let start = changes.start_date.unwrap_or(self.window.start());
        let end = changes.end_date.unwrap_or(self.window.end());

        let next = Self {
            window: ActiveWindow::new(start, end)?,
            adjustment_type: changes.adjustment_type.unwrap_or(self.adjustment_type),
            factor: changes.factor.unwrap_or(self.factor),
            reason: changes.reason.unwrap_or_else(|| self.reason.clone()),
            ..self.clone()
        };
        next.validate()?;
        Ok(next)
    }

    pub fn validate(&self) -> DomainResult<()> {
        self.product_id.require("product_id")?;
        self.organization_id.require("organization_id")?;
        validate_factor(self.factor)?;
        validate_reason(&self.reason)
    }

    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.window.contains(day)
    }
}

impl OrganizationScoped for DemandAdjustment {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

impl Entity for DemandAdjustment {
    type Id = AdjustmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Compose active demand factors onto a base CPD and round up to a whole unit.
pub fn apply_adjusted_cpd(base_cpd: f64, active: &[DemandAdjustment]) -> f64 {
    active
        .iter()
        .fold(base_cpd, |cpd, adj| cpd * adj.factor)
        .ceil()
}
