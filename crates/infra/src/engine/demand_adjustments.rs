use chrono::NaiveDate;
use tracing::info;

use flowplan_core::{AdjustmentId, OrganizationId, ProductId};
use flowplan_ddmrp::{
    DemandAdjustment, DemandAdjustmentChanges, FadCreated, FadDeleted, FadUpdated,
    NewDemandAdjustment,
};

use super::{EngineError, EnginePorts, EngineResult};

/// Demand adjustment (FAD) registry.
#[derive(Debug, Clone)]
pub struct DemandAdjustmentService {
    ports: EnginePorts,
}

impl DemandAdjustmentService {
    pub fn new(ports: EnginePorts) -> Self {
        Self { ports }
    }

    pub fn create(&self, input: NewDemandAdjustment) -> EngineResult<DemandAdjustment> {
        let now = self.ports.clock.now();
        let fad = DemandAdjustment::create(AdjustmentId::new(), input, now)?;

        self.ports
            .demand_adjustments
            .create(fad.clone())
            .map_err(|e| EngineError::store("failed to create demand adjustment", e))?;
        self.ports
            .publisher
            .publish(FadCreated::from_adjustment(&fad, now).into())
            .map_err(|e| EngineError::publish("failed to publish FAD created event", e))?;

        info!(
            organization = %fad.organization_id,
            product = %fad.product_id,
            adjustment = %fad.id,
            kind = %fad.adjustment_type,
            factor = fad.factor,
            "demand adjustment created"
        );
        Ok(fad)
    }

    pub fn update(
        &self,
        organization_id: OrganizationId,
        id: AdjustmentId,
        changes: DemandAdjustmentChanges,
    ) -> EngineResult<DemandAdjustment> {
        let current = self.get(organization_id, id)?;
        let revised = current.revise(changes)?;

        self.ports
            .demand_adjustments
            .update(revised.clone())
            .map_err(|e| EngineError::store("failed to update demand adjustment", e))?;
        self.ports
            .publisher
            .publish(FadUpdated::from_adjustment(&revised, self.ports.clock.now()).into())
            .map_err(|e| EngineError::publish("failed to publish FAD updated event", e))?;

        info!(organization = %organization_id, adjustment = %id, "demand adjustment updated");
        Ok(revised)
    }

    pub fn delete(&self, organization_id: OrganizationId, id: AdjustmentId) -> EngineResult<()> {
        let current = self.get(organization_id, id)?;

        self.ports
            .demand_adjustments
            .delete(organization_id, id)
            .map_err(|e| EngineError::store("failed to delete demand adjustment", e))?;

        let deleted = FadDeleted {
            organization_id,
            adjustment_id: id,
            product_id: current.product_id,
            occurred_at: self.ports.clock.now(),
        };
        self.ports
            .publisher
            .publish(deleted.into())
            .map_err(|e| EngineError::publish("failed to publish FAD deleted event", e))?;

        info!(organization = %organization_id, adjustment = %id, "demand adjustment deleted");
        Ok(())
    }

    pub fn get(
        &self,
        organization_id: OrganizationId,
        id: AdjustmentId,
    ) -> EngineResult<DemandAdjustment> {
        let organization_id = organization_id.require("organization_id")?;
        let id = id.require("id")?;
        self.ports
            .demand_adjustments
            .get(organization_id, id)
            .map_err(|e| EngineError::store("failed to get demand adjustment", e))?
            .ok_or_else(|| EngineError::not_found(format!("demand adjustment {id}")))
    }

    /// Adjustments of `product_id` active on `date` (calendar day, inclusive).
    pub fn list_active_for_date(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        date: NaiveDate,
    ) -> EngineResult<Vec<DemandAdjustment>> {
        let organization_id = organization_id.require("organization_id")?;
        let product_id = product_id.require("product_id")?;
        self.ports
            .demand_adjustments
            .list_active_for_date(organization_id, product_id, date)
            .map_err(|e| EngineError::store("failed to get active demand adjustments", e))
    }

    pub fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> EngineResult<Vec<DemandAdjustment>> {
        let organization_id = organization_id.require("organization_id")?;
        let product_id = product_id.require("product_id")?;
        self.ports
            .demand_adjustments
            .list_by_product(organization_id, product_id)
            .map_err(|e| EngineError::store("failed to list demand adjustments", e))
    }

    pub fn list_by_organization(
        &self,
        organization_id: OrganizationId,
    ) -> EngineResult<Vec<DemandAdjustment>> {
        let organization_id = organization_id.require("organization_id")?;
        self.ports
            .demand_adjustments
            .list_by_organization(organization_id)
            .map_err(|e| EngineError::store("failed to list demand adjustments", e))
    }
}
