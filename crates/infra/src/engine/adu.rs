use chrono::NaiveDate;
use tracing::info;

use flowplan_core::{AduCalculationId, OrganizationId, ProductId};
use flowplan_ddmrp::{AduCalculated, AduCalculation, AduConfig, NewAduCalculation};

use super::{EngineError, EnginePorts, EngineResult};

/// Average daily usage calculation and lookups.
#[derive(Debug, Clone)]
pub struct AduService {
    ports: EnginePorts,
    config: AduConfig,
}

impl AduService {
    pub fn new(ports: EnginePorts, config: AduConfig) -> Self {
        Self { ports, config }
    }

    /// Compute today's ADU from a demand series (oldest first), persist it and
    /// publish `adu.calculated`.
    pub fn calculate(&self, input: NewAduCalculation) -> EngineResult<AduCalculation> {
        let now = self.ports.clock.now();
        let calc = AduCalculation::calculate(AduCalculationId::new(), &input, &self.config, now)?;

        self.ports
            .adu
            .create(calc.clone())
            .map_err(|e| EngineError::store("failed to save ADU calculation", e))?;

        self.ports
            .publisher
            .publish(AduCalculated::from_calculation(&calc).into())
            .map_err(|e| EngineError::publish("failed to publish ADU calculated event", e))?;

        info!(
            organization = %calc.organization_id,
            product = %calc.product_id,
            method = %calc.method,
            adu = calc.adu_value,
            "ADU calculated"
        );
        Ok(calc)
    }

    pub fn get_latest(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> EngineResult<AduCalculation> {
        let organization_id = organization_id.require("organization_id")?;
        let product_id = product_id.require("product_id")?;
        self.ports
            .adu
            .get_latest(organization_id, product_id)
            .map_err(|e| EngineError::store("failed to get latest ADU", e))?
            .ok_or_else(|| EngineError::not_found(format!("ADU for product {product_id}")))
    }

    pub fn get_by_date(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        date: NaiveDate,
    ) -> EngineResult<AduCalculation> {
        let organization_id = organization_id.require("organization_id")?;
        let product_id = product_id.require("product_id")?;
        self.ports
            .adu
            .get_by_date(organization_id, product_id, date)
            .map_err(|e| EngineError::store("failed to get ADU by date", e))?
            .ok_or_else(|| {
                EngineError::not_found(format!("ADU for product {product_id} on {date}"))
            })
    }

    /// Newest first. `limit` defaults to the configured history length.
    pub fn list_history(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        limit: Option<usize>,
    ) -> EngineResult<Vec<AduCalculation>> {
        let organization_id = organization_id.require("organization_id")?;
        let product_id = product_id.require("product_id")?;
        let limit = limit.filter(|l| *l > 0).unwrap_or(self.config.history_limit);
        self.ports
            .adu
            .list_history(organization_id, product_id, limit)
            .map_err(|e| EngineError::store("failed to list ADU history", e))
    }
}
