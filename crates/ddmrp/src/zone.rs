//! Buffer zone sizing and net-flow-position classification.
//!
//! Everything here is a pure function of its inputs:
//!
//! ```text
//! red_base    = LTD · CPD · lead_time_factor
//! red_safety  = red_base · variability_factor
//! red_zone    = red_base + red_safety
//! yellow_zone = CPD · LTD
//! green_zone  = max(MOQ, order_frequency · CPD, LTD · CPD · lead_time_factor)
//! ```
//!
//! Classification compares the net flow position against the cumulative
//! thresholds (`top_of_red`, `top_of_yellow`, `top_of_green`); every band is
//! lower-bound inclusive.

use serde::{Deserialize, Serialize};

use flowplan_core::DomainError;

/// Buffer zone a net flow position falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Green,
    Yellow,
    Red,
    BelowRed,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Green => "green",
            Zone::Yellow => "yellow",
            Zone::Red => "red",
            Zone::BelowRed => "below_red",
        }
    }
}

impl core::fmt::Display for Zone {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Zone {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "green" => Ok(Zone::Green),
            "yellow" => Ok(Zone::Yellow),
            "red" => Ok(Zone::Red),
            "below_red" => Ok(Zone::BelowRed),
            other => Err(DomainError::validation(format!("invalid zone: {other}"))),
        }
    }
}

/// Alert level derived one-to-one from the zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Normal,
    Monitor,
    Replenish,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Monitor => "monitor",
            AlertLevel::Replenish => "replenish",
            AlertLevel::Critical => "critical",
        }
    }

    /// Replenish and critical buffers raise an alert and feed replenishment planning.
    pub fn needs_replenishment(&self) -> bool {
        matches!(self, AlertLevel::Replenish | AlertLevel::Critical)
    }
}

impl core::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AlertLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(AlertLevel::Normal),
            "monitor" => Ok(AlertLevel::Monitor),
            "replenish" => Ok(AlertLevel::Replenish),
            "critical" => Ok(AlertLevel::Critical),
            other => Err(DomainError::validation(format!("invalid alert level: {other}"))),
        }
    }
}

/// Inputs of the zone calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneInputs {
    /// Consumption per day (possibly adjusted ADU).
    pub cpd: f64,
    /// Supplier lead time in days.
    pub ltd_days: u32,
    pub lead_time_factor: f64,
    pub variability_factor: f64,
    /// Minimum order quantity.
    pub moq: u32,
    pub order_frequency_days: u32,
}

/// Zone sizes produced by the calculator (and possibly post-adjusted).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZoneSizes {
    pub red_base: f64,
    pub red_safety: f64,
    pub red_zone: f64,
    pub yellow_zone: f64,
    pub green_zone: f64,
}

impl ZoneSizes {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds::from_zones(self.red_zone, self.yellow_zone, self.green_zone)
    }
}

/// Compute red/yellow/green zone sizes.
pub fn calculate_buffer_zones(inputs: &ZoneInputs) -> ZoneSizes {
    let ltd = f64::from(inputs.ltd_days);

    let red_base = ltd * inputs.cpd * inputs.lead_time_factor;
    let red_safety = red_base * inputs.variability_factor;
    let red_zone = red_base + red_safety;
    let yellow_zone = inputs.cpd * ltd;

    let by_moq = f64::from(inputs.moq);
    let by_order_cycle = f64::from(inputs.order_frequency_days) * inputs.cpd;
    let by_lead_time = ltd * inputs.cpd * inputs.lead_time_factor;
    let green_zone = by_moq.max(by_order_cycle).max(by_lead_time);

    ZoneSizes {
        red_base,
        red_safety,
        red_zone,
        yellow_zone,
        green_zone,
    }
}

/// Net flow position: on-hand + on-order − qualified demand.
pub fn net_flow_position(on_hand: f64, on_order: f64, qualified_demand: f64) -> f64 {
    on_hand + on_order - qualified_demand
}

/// Cumulative zone thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Thresholds {
    pub top_of_red: f64,
    pub top_of_yellow: f64,
    pub top_of_green: f64,
}

impl Thresholds {
    pub fn from_zones(red_zone: f64, yellow_zone: f64, green_zone: f64) -> Self {
        let top_of_red = red_zone;
        let top_of_yellow = top_of_red + yellow_zone;
        let top_of_green = top_of_yellow + green_zone;
        Self {
            top_of_red,
            top_of_yellow,
            top_of_green,
        }
    }

    /// Classify a net flow position. Total: anything not matched above falls to below-red.
    pub fn classify(&self, nfp: f64) -> (Zone, AlertLevel) {
        if nfp >= self.top_of_yellow {
            (Zone::Green, AlertLevel::Normal)
        } else if nfp >= self.top_of_red {
            (Zone::Yellow, AlertLevel::Monitor)
        } else if nfp > 0.0 {
            (Zone::Red, AlertLevel::Replenish)
        } else {
            (Zone::BelowRed, AlertLevel::Critical)
        }
    }

    /// Buffer penetration in percent of top-of-green; unset for an empty buffer.
    pub fn penetration(&self, nfp: f64) -> Option<f64> {
        if self.top_of_green > 0.0 {
            Some(nfp / self.top_of_green * 100.0)
        } else {
            None
        }
    }
}
