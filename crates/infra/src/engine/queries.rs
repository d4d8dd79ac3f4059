use chrono::NaiveDate;

use flowplan_core::{BufferId, OrganizationId, ProductId};
use flowplan_ddmrp::{AlertLevel, Buffer, BufferHistory, Zone};

use crate::config::HistoryConfig;

use super::{EngineError, EnginePorts, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferFilter {
    #[default]
    All,
    Zone(Zone),
    AlertLevel(AlertLevel),
}

/// Read-only buffer and history queries, including replenishment signals.
#[derive(Debug, Clone)]
pub struct BufferQueries {
    ports: EnginePorts,
    history: HistoryConfig,
}

impl BufferQueries {
    pub fn new(ports: EnginePorts, history: HistoryConfig) -> Self {
        Self { ports, history }
    }

    pub fn get_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> EngineResult<Buffer> {
        let organization_id = organization_id.require("organization_id")?;
        let product_id = product_id.require("product_id")?;
        self.ports
            .buffers
            .get_by_product(organization_id, product_id)
            .map_err(|e| EngineError::store("failed to get buffer", e))?
            .ok_or_else(|| EngineError::not_found(format!("buffer for product {product_id}")))
    }

    pub fn list(
        &self,
        organization_id: OrganizationId,
        filter: BufferFilter,
    ) -> EngineResult<Vec<Buffer>> {
        let organization_id = organization_id.require("organization_id")?;
        let buffers = &self.ports.buffers;
        match filter {
            BufferFilter::All => buffers.list_all(organization_id),
            BufferFilter::Zone(zone) => buffers.list_by_zone(organization_id, zone),
            BufferFilter::AlertLevel(level) => buffers.list_by_alert_level(organization_id, level),
        }
        .map_err(|e| EngineError::store("failed to list buffers", e))
    }

    /// Buffers that need an order: critical ones first, then replenish.
    pub fn replenishment_signals(&self, organization_id: OrganizationId) -> EngineResult<Vec<Buffer>> {
        let mut signals = self.list(organization_id, BufferFilter::AlertLevel(AlertLevel::Critical))?;
        signals.extend(self.list(organization_id, BufferFilter::AlertLevel(AlertLevel::Replenish))?);
        Ok(signals)
    }

    /// Newest first. `limit` defaults to the configured history length.
    pub fn history_by_buffer(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
        limit: Option<usize>,
    ) -> EngineResult<Vec<BufferHistory>> {
        let organization_id = organization_id.require("organization_id")?;
        let buffer_id = buffer_id.require("buffer_id")?;
        let limit = limit.filter(|l| *l > 0).unwrap_or(self.history.default_limit);
        self.ports
            .history
            .list_by_buffer(organization_id, buffer_id, limit)
            .map_err(|e| EngineError::store("failed to list buffer history", e))
    }

    /// Oldest first, both bounds inclusive.
    pub fn history_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<BufferHistory>> {
        let organization_id = organization_id.require("organization_id")?;
        let product_id = product_id.require("product_id")?;
        if to < from {
            return Err(EngineError::validation("end date must be after start date"));
        }
        self.ports
            .history
            .list_by_product(organization_id, product_id, from, to)
            .map_err(|e| EngineError::store("failed to list buffer history", e))
    }
}
