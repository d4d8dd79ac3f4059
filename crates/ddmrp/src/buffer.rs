use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flowplan_core::{
    BufferId, BufferProfileId, DomainError, DomainResult, Entity, OrganizationId, ProductId,
};
use flowplan_events::OrganizationScoped;

use crate::zone::{AlertLevel, Thresholds, Zone, ZoneSizes, net_flow_position};

/// Inventory signals feeding the net flow position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowInputs {
    pub on_hand: f64,
    pub on_order: f64,
    pub qualified_demand: f64,
}

impl FlowInputs {
    pub fn new(on_hand: f64, on_order: f64, qualified_demand: f64) -> Self {
        Self {
            on_hand,
            on_order,
            qualified_demand,
        }
    }

    pub fn net_flow_position(&self) -> f64 {
        net_flow_position(self.on_hand, self.on_order, self.qualified_demand)
    }
}

/// Result of a full sizing pass: CPD/LTD and the (possibly adjusted) zone sizes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferSizing {
    pub profile_id: BufferProfileId,
    pub cpd: f64,
    pub ltd_days: u32,
    pub zones: ZoneSizes,
}

impl BufferSizing {
    pub fn validate(&self) -> DomainResult<()> {
        self.profile_id.require("buffer_profile_id")?;
        if !self.cpd.is_finite() || self.cpd < 0.0 {
            return Err(DomainError::validation("cpd must be a non-negative number"));
        }
        if self.ltd_days == 0 {
            return Err(DomainError::validation("ltd must be greater than 0"));
        }
        let z = &self.zones;
        let sizes = [z.red_base, z.red_safety, z.red_zone, z.yellow_zone, z.green_zone];
        if sizes.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(DomainError::validation("buffer zones must be non-negative numbers"));
        }
        Ok(())
    }
}

/// Per-product inventory buffer.
///
/// Derived fields (thresholds, NFP, penetration, zone, alert level) are never
/// set directly: every transition returns a new snapshot with all of them
/// recomputed from the sizing and the flow inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buffer {
    id: BufferId,
    product_id: ProductId,
    organization_id: OrganizationId,
    sizing: BufferSizing,
    thresholds: Thresholds,
    flow: FlowInputs,
    net_flow_position: f64,
    penetration: Option<f64>,
    zone: Zone,
    alert_level: AlertLevel,
    last_recalculated_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Buffer {
    /// First sizing of a product's buffer. Flow inputs start at zero.
    pub fn new(
        id: BufferId,
        product_id: ProductId,
        organization_id: OrganizationId,
        sizing: BufferSizing,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let id = id.require("buffer_id")?;
        let product_id = product_id.require("product_id")?;
        let organization_id = organization_id.require("organization_id")?;
        sizing.validate()?;

        Ok(Self {
            id,
            product_id,
            organization_id,
            sizing,
            thresholds: Thresholds::default(),
            flow: FlowInputs::default(),
            net_flow_position: 0.0,
            penetration: None,
            zone: Zone::BelowRed,
            alert_level: AlertLevel::Critical,
            last_recalculated_at: now,
            created_at: now,
            updated_at: now,
        }
        .classified())
    }

    /// Full recalculation: new sizing, same flow inputs.
    pub fn with_sizing(&self, sizing: BufferSizing, now: DateTime<Utc>) -> DomainResult<Self> {
        sizing.validate()?;
        let mut next = self.clone();
        next.sizing = sizing;
        next.last_recalculated_at = now;
        next.updated_at = now;
        Ok(next.classified())
    }

    /// Net-flow update: new flow inputs, zone sizes untouched.
    pub fn with_flow(&self, flow: FlowInputs, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.flow = flow;
        next.updated_at = now;
        next.classified()
    }

    fn classified(mut self) -> Self {
        self.thresholds = self.sizing.zones.thresholds();
        self.net_flow_position = self.flow.net_flow_position();
        let (zone, alert_level) = self.thresholds.classify(self.net_flow_position);
        self.zone = zone;
        self.alert_level = alert_level;
        self.penetration = self.thresholds.penetration(self.net_flow_position);
        self
    }

    /// Quantity that would bring a red-zone buffer back to top-of-green.
    pub fn replenishment_quantity(&self) -> Option<f64> {
        (self.zone == Zone::Red).then(|| self.thresholds.top_of_green - self.net_flow_position)
    }

    pub fn id_typed(&self) -> BufferId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    pub fn profile_id(&self) -> BufferProfileId {
        self.sizing.profile_id
    }

    pub fn sizing(&self) -> &BufferSizing {
        &self.sizing
    }

    pub fn cpd(&self) -> f64 {
        self.sizing.cpd
    }

    pub fn ltd_days(&self) -> u32 {
        self.sizing.ltd_days
    }

    pub fn zones(&self) -> &ZoneSizes {
        &self.sizing.zones
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn flow(&self) -> &FlowInputs {
        &self.flow
    }

    pub fn net_flow_position(&self) -> f64 {
        self.net_flow_position
    }

    pub fn penetration(&self) -> Option<f64> {
        self.penetration
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }

    pub fn alert_level(&self) -> AlertLevel {
        self.alert_level
    }

    pub fn last_recalculated_at(&self) -> DateTime<Utc> {
        self.last_recalculated_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl OrganizationScoped for Buffer {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

impl Entity for Buffer {
    type Id = BufferId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::{ZoneInputs, calculate_buffer_zones};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn test_sizing() -> BufferSizing {
        let zones = calculate_buffer_zones(&ZoneInputs {
            cpd: 100.0,
            ltd_days: 30,
            lead_time_factor: 0.5,
            variability_factor: 0.5,
            moq: 500,
            order_frequency_days: 7,
        });
        BufferSizing {
            profile_id: BufferProfileId::new(),
            cpd: 100.0,
            ltd_days: 30,
            zones,
        }
    }

    fn test_buffer() -> Buffer {
        Buffer::new(
            BufferId::new(),
            ProductId::new(),
            OrganizationId::new(),
            test_sizing(),
            t0(),
        )
        .unwrap()
    }

    #[test]
    fn new_buffer_with_no_stock_is_below_red() {
        let b = test_buffer();
        assert_eq!(b.net_flow_position(), 0.0);
        assert_eq!(b.zone(), Zone::BelowRed);
        assert_eq!(b.alert_level(), AlertLevel::Critical);
        assert_eq!(b.thresholds().top_of_green, 6750.0);
        assert_eq!(b.penetration(), Some(0.0));
    }

    #[test]
    fn flow_update_reclassifies_without_touching_sizes() {
        let b = test_buffer();
        let later = t0() + chrono::Duration::hours(2);

        let next = b.with_flow(FlowInputs::new(3000.0, 500.0, 200.0), later);

        assert_eq!(next.net_flow_position(), 3300.0);
        assert_eq!(next.zone(), Zone::Yellow);
        assert_eq!(next.alert_level(), AlertLevel::Monitor);
        assert_eq!(next.zones(), b.zones());
        assert_eq!(next.last_recalculated_at(), t0());
        assert_eq!(next.updated_at(), later);

        // the source snapshot is unchanged
        assert_eq!(b.zone(), Zone::BelowRed);
    }

    #[test]
    fn resizing_keeps_flow_inputs() {
        let b = test_buffer().with_flow(FlowInputs::new(3000.0, 0.0, 0.0), t0());
        assert_eq!(b.zone(), Zone::Yellow);

        let mut smaller = test_sizing();
        smaller.zones.yellow_zone = 500.0;
        let later = t0() + chrono::Duration::days(1);
        let next = b.with_sizing(smaller, later).unwrap();

        assert_eq!(next.flow(), b.flow());
        assert_eq!(next.zone(), Zone::Green);
        assert_eq!(next.last_recalculated_at(), later);
    }

    #[test]
    fn sizing_with_non_finite_values_is_rejected() {
        let mut nan_zone = test_sizing();
        nan_zone.zones.red_safety = f64::NAN;
        assert!(matches!(nan_zone.validate(), Err(DomainError::Validation(_))));

        let mut infinite_cpd = test_sizing();
        infinite_cpd.cpd = f64::INFINITY;
        let err = test_buffer().with_sizing(infinite_cpd, t0()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn replenishment_quantity_only_in_red_zone() {
        let b = test_buffer();
        assert_eq!(b.replenishment_quantity(), None);

        let red = b.with_flow(FlowInputs::new(1000.0, 0.0, 0.0), t0());
        assert_eq!(red.zone(), Zone::Red);
        assert_eq!(red.replenishment_quantity(), Some(5750.0));

        let green = b.with_flow(FlowInputs::new(6000.0, 0.0, 0.0), t0());
        assert_eq!(green.replenishment_quantity(), None);
    }

    #[test]
    fn rejects_invalid_sizing() {
        let mut sizing = test_sizing();
        sizing.ltd_days = 0;
        let err = Buffer::new(
            BufferId::new(),
            ProductId::new(),
            OrganizationId::new(),
            sizing,
            t0(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut sizing = test_sizing();
        sizing.cpd = -1.0;
        assert!(test_buffer().with_sizing(sizing, t0()).is_err());
    }

    #[test]
    fn rejects_nil_identifiers() {
        let err = Buffer::new(
            BufferId::new(),
            ProductId::nil(),
            OrganizationId::new(),
            test_sizing(),
            t0(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::validation("product_id is required"));
    }
}
