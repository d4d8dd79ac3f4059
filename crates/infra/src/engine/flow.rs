use tracing::debug;

use flowplan_core::{OrganizationId, ProductId};
use flowplan_ddmrp::{Buffer, FlowInputs};

use super::recalculation::publish_buffer_signals;
use super::{EngineError, EnginePorts, EngineResult};

/// New inventory position of one product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetFlowUpdate {
    pub organization_id: OrganizationId,
    pub product_id: ProductId,
    pub on_hand: f64,
    pub on_order: f64,
    pub qualified_demand: f64,
}

impl NetFlowUpdate {
    fn validate(&self) -> EngineResult<()> {
        self.organization_id.require("organization_id")?;
        self.product_id.require("product_id")?;
        let inputs = [
            ("on_hand", self.on_hand),
            ("on_order", self.on_order),
            ("qualified_demand", self.qualified_demand),
        ];
        for (name, value) in inputs {
            if !value.is_finite() {
                return Err(EngineError::validation(format!("{name} must be finite")));
            }
        }
        Ok(())
    }
}

/// Re-classifies an existing buffer when inventory or demand moves.
///
/// Zone sizes are kept as the last full recalculation left them.
#[derive(Debug, Clone)]
pub struct NetFlowUpdater {
    ports: EnginePorts,
}

impl NetFlowUpdater {
    pub fn new(ports: EnginePorts) -> Self {
        Self { ports }
    }

    pub fn update(&self, update: NetFlowUpdate) -> EngineResult<Buffer> {
        update.validate()?;
        let NetFlowUpdate {
            organization_id,
            product_id,
            ..
        } = update;

        let current = self
            .ports
            .buffers
            .get_by_product(organization_id, product_id)
            .map_err(|e| EngineError::store("failed to get buffer", e))?
            .ok_or_else(|| EngineError::not_found(format!("buffer for product {product_id}")))?;

        let now = self.ports.clock.now();
        let flow = FlowInputs::new(update.on_hand, update.on_order, update.qualified_demand);
        let next = current.with_flow(flow, now);

        self.ports
            .buffers
            .save(next.clone())
            .map_err(|e| EngineError::store("failed to save buffer", e))?;

        debug!(
            organization = %organization_id,
            product = %product_id,
            nfp = next.net_flow_position(),
            zone = %next.zone(),
            "net flow position updated"
        );

        publish_buffer_signals(&self.ports, &next, Some(current.zone()), false, now)?;
        Ok(next)
    }
}
