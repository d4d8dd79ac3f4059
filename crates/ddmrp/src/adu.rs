//! Average daily usage (ADU).
//!
//! Three methods turn an oldest-to-newest demand series into one daily figure:
//! simple average, exponential smoothing and a recency-weighted moving average.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flowplan_core::{AduCalculationId, DomainError, DomainResult, Entity, OrganizationId, ProductId};
use flowplan_events::OrganizationScoped;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AduMethod {
    Average,
    Exponential,
    Weighted,
}

impl AduMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AduMethod::Average => "average",
            AduMethod::Exponential => "exponential",
            AduMethod::Weighted => "weighted",
        }
    }
}

impl core::fmt::Display for AduMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AduMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "average" => Ok(AduMethod::Average),
            "exponential" => Ok(AduMethod::Exponential),
            "weighted" => Ok(AduMethod::Weighted),
            other => Err(DomainError::validation(format!(
                "invalid ADU calculation method: {other}"
            ))),
        }
    }
}

/// Tunables of the ADU calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AduConfig {
    /// α used when the caller passes none, or one outside `(0, 1]`.
    pub default_alpha: f64,
    /// Period recorded on a calculation when the caller gives none.
    pub default_period_days: u32,
    /// Default length of an ADU history listing.
    pub history_limit: usize,
}

impl Default for AduConfig {
    fn default() -> Self {
        Self {
            default_alpha: 0.3,
            default_period_days: 30,
            history_limit: 30,
        }
    }
}

impl AduConfig {
    pub fn validate(&self) -> DomainResult<()> {
        if !is_valid_alpha(self.default_alpha) {
            return Err(DomainError::validation("default alpha must be in (0, 1]"));
        }
        if self.default_period_days == 0 {
            return Err(DomainError::validation(
                "default period days must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn is_valid_alpha(alpha: f64) -> bool {
    alpha > 0.0 && alpha <= 1.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Arithmetic mean; `0` for an empty series.
pub fn simple_average(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Seeded with the first observation; `alpha` must already be in `(0, 1]`.
pub fn exponential_smoothing(data: &[f64], alpha: f64) -> f64 {
    let Some((first, rest)) = data.split_first() else {
        return 0.0;
    };
    rest.iter()
        .fold(*first, |smoothed, value| alpha * value + (1.0 - alpha) * smoothed)
}

/// Weights each observation by its 1-based recency rank, rounded to 2 decimals.
pub fn weighted_moving_average(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let n = data.len() as f64;
    let total_weight = n * (n + 1.0) / 2.0;
    let weighted_sum: f64 = data
        .iter()
        .enumerate()
        .map(|(i, value)| value * (i + 1) as f64)
        .sum();
    round2(weighted_sum / total_weight)
}

/// Dispatch on `method`. An absent or out-of-range `alpha` falls back to the
/// configured default; nothing else is defaulted.
pub fn average_daily_usage(
    data: &[f64],
    method: AduMethod,
    alpha: Option<f64>,
    config: &AduConfig,
) -> DomainResult<f64> {
    if data.is_empty() {
        return Err(DomainError::validation("demand data is required"));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(DomainError::validation("demand data must be finite"));
    }

    let value = match method {
        AduMethod::Average => simple_average(data),
        AduMethod::Exponential => {
            let alpha = alpha
                .filter(|a| is_valid_alpha(*a))
                .unwrap_or(config.default_alpha);
            exponential_smoothing(data, alpha)
        }
        AduMethod::Weighted => weighted_moving_average(data),
    };
    Ok(value)
}

/// Input to a new ADU calculation snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAduCalculation {
    pub product_id: ProductId,
    pub organization_id: OrganizationId,
    pub demand_data: Vec<f64>,
    pub method: AduMethod,
    pub period_days: Option<u32>,
    pub alpha: Option<f64>,
}

/// Immutable ADU snapshot; one per (product, organization, calculation date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AduCalculation {
    pub id: AduCalculationId,
    pub product_id: ProductId,
    pub organization_id: OrganizationId,
    pub calculation_date: NaiveDate,
    pub adu_value: f64,
    pub method: AduMethod,
    pub period_days: u32,
    pub created_at: DateTime<Utc>,
}

impl AduCalculation {
    pub fn calculate(
        id: AduCalculationId,
        input: &NewAduCalculation,
        config: &AduConfig,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let product_id = input.product_id.require("product_id")?;
        let organization_id = input.organization_id.require("organization_id")?;
        let adu_value = average_daily_usage(&input.demand_data, input.method, input.alpha, config)?;

        let calc = Self {
            id,
            product_id,
            organization_id,
            calculation_date: now.date_naive(),
            adu_value,
            method: input.method,
            period_days: input.period_days.unwrap_or(config.default_period_days),
            created_at: now,
        };
        calc.validate()?;
        Ok(calc)
    }

    pub fn validate(&self) -> DomainResult<()> {
        self.product_id.require("product_id")?;
        self.organization_id.require("organization_id")?;
        if self.adu_value < 0.0 {
            return Err(DomainError::validation("adu_value must be non-negative"));
        }
        if self.period_days == 0 {
            return Err(DomainError::validation("period_days must be greater than 0"));
        }
        Ok(())
    }
}

impl OrganizationScoped for AduCalculation {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

impl Entity for AduCalculation {
    type Id = AduCalculationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
