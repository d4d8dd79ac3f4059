use chrono::NaiveDate;
use tracing::info;

use flowplan_core::{AdjustmentId, BufferId, OrganizationId, ProductId};
use flowplan_ddmrp::{BufferAdjustment, BufferAdjustmentChanges, NewBufferAdjustment};

use super::{EngineError, EnginePorts, EngineResult};

/// Buffer adjustment registry. Adjustments take effect on the next recalculation.
#[derive(Debug, Clone)]
pub struct BufferAdjustmentService {
    ports: EnginePorts,
}

impl BufferAdjustmentService {
    pub fn new(ports: EnginePorts) -> Self {
        Self { ports }
    }

    /// The target buffer must exist in the organization and belong to the product.
    pub fn create(&self, input: NewBufferAdjustment) -> EngineResult<BufferAdjustment> {
        let adjustment = BufferAdjustment::create(AdjustmentId::new(), input, self.ports.clock.now())?;

        let buffer = self
            .ports
            .buffers
            .get(adjustment.organization_id, adjustment.buffer_id)
            .map_err(|e| EngineError::store("failed to get buffer", e))?
            .ok_or_else(|| EngineError::not_found(format!("buffer {}", adjustment.buffer_id)))?;
        if buffer.product_id() != adjustment.product_id {
            return Err(EngineError::validation(format!(
                "buffer {} does not belong to product {}",
                adjustment.buffer_id, adjustment.product_id
            )));
        }

        self.ports
            .buffer_adjustments
            .create(adjustment.clone())
            .map_err(|e| EngineError::store("failed to create buffer adjustment", e))?;

        info!(
            organization = %adjustment.organization_id,
            buffer = %adjustment.buffer_id,
            adjustment = %adjustment.id,
            kind = adjustment.adjustment_type.as_str(),
            target = adjustment.target_zone.as_str(),
            factor = adjustment.factor,
            "buffer adjustment created"
        );
        Ok(adjustment)
    }

    pub fn update(
        &self,
        organization_id: OrganizationId,
        id: AdjustmentId,
        changes: BufferAdjustmentChanges,
    ) -> EngineResult<BufferAdjustment> {
        let revised = self.get(organization_id, id)?.revise(changes)?;
        self.ports
            .buffer_adjustments
            .update(revised.clone())
            .map_err(|e| EngineError::store("failed to update buffer adjustment", e))?;

        info!(organization = %organization_id, adjustment = %id, "buffer adjustment updated");
        Ok(revised)
    }

    pub fn delete(&self, organization_id: OrganizationId, id: AdjustmentId) -> EngineResult<()> {
        self.get(organization_id, id)?;
        self.ports
            .buffer_adjustments
            .delete(organization_id, id)
            .map_err(|e| EngineError::store("failed to delete buffer adjustment", e))?;

        info!(organization = %organization_id, adjustment = %id, "buffer adjustment deleted");
        Ok(())
    }

    pub fn get(
        &self,
        organization_id: OrganizationId,
        id: AdjustmentId,
    ) -> EngineResult<BufferAdjustment> {
        let organization_id = organization_id.require("organization_id")?;
        let id = id.require("id")?;
        self.ports
            .buffer_adjustments
            .get(organization_id, id)
            .map_err(|e| EngineError::store("failed to get buffer adjustment", e))?
            .ok_or_else(|| EngineError::not_found(format!("buffer adjustment {id}")))
    }

    pub fn list_active_for_date(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
        date: NaiveDate,
    ) -> EngineResult<Vec<BufferAdjustment>> {
        let organization_id = organization_id.require("organization_id")?;
        let buffer_id = buffer_id.require("buffer_id")?;
        self.ports
            .buffer_adjustments
            .list_active_for_date(organization_id, buffer_id, date)
            .map_err(|e| EngineError::store("failed to get active buffer adjustments", e))
    }

    pub fn list_by_buffer(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
    ) -> EngineResult<Vec<BufferAdjustment>> {
        let organization_id = organization_id.require("organization_id")?;
        let buffer_id = buffer_id.require("buffer_id")?;
        self.ports
            .buffer_adjustments
            .list_by_buffer(organization_id, buffer_id)
            .map_err(|e| EngineError::store("failed to list buffer adjustments", e))
    }

    pub fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> EngineResult<Vec<BufferAdjustment>> {
        let organization_id = organization_id.require("organization_id")?;
        let product_id = product_id.require("product_id")?;
        self.ports
            .buffer_adjustments
            .list_by_product(organization_id, product_id)
            .map_err(|e| EngineError::store("failed to list buffer adjustments", e))
    }
}
