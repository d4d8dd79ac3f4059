use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use flowplan_core::{BufferHistoryId, BufferId, Entity, OrganizationId, ProductId};
use flowplan_events::OrganizationScoped;

use crate::buffer::Buffer;
use crate::catalog::{BufferProfile, ProductSupplier};

/// Daily snapshot of a buffer's sizing inputs and outputs.
///
/// One row per (buffer, snapshot date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferHistory {
    pub id: BufferHistoryId,
    pub buffer_id: BufferId,
    pub product_id: ProductId,
    pub organization_id: OrganizationId,
    pub snapshot_date: NaiveDate,
    pub cpd: f64,
    pub ltd_days: u32,
    pub red_base: f64,
    pub red_safety: f64,
    pub red_zone: f64,
    pub yellow_zone: f64,
    pub green_zone: f64,
    pub lead_time_factor: f64,
    pub variability_factor: f64,
    pub moq: u32,
    pub order_frequency_days: u32,
    pub has_adjustments: bool,
    pub created_at: DateTime<Utc>,
}

impl BufferHistory {
    pub fn snapshot(
        id: BufferHistoryId,
        buffer: &Buffer,
        profile: &BufferProfile,
        supplier: &ProductSupplier,
        has_adjustments: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let zones = buffer.zones();
        Self {
            id,
            buffer_id: buffer.id_typed(),
            product_id: buffer.product_id(),
            organization_id: buffer.organization_id(),
            snapshot_date: now.date_naive(),
            cpd: buffer.cpd(),
            ltd_days: buffer.ltd_days(),
            red_base: zones.red_base,
            red_safety: zones.red_safety,
            red_zone: zones.red_zone,
            yellow_zone: zones.yellow_zone,
            green_zone: zones.green_zone,
            lead_time_factor: profile.lead_time_factor,
            variability_factor: profile.variability_factor,
            moq: supplier.moq,
            order_frequency_days: profile.order_frequency_days,
            has_adjustments,
            created_at: now,
        }
    }
}

impl OrganizationScoped for BufferHistory {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }
}

impl Entity for BufferHistory {
    type Id = BufferHistoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
