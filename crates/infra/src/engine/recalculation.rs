//! Full buffer recalculation, single product and organization-wide.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use flowplan_core::{BufferHistoryId, BufferId, OrganizationId, ProductId};
use flowplan_ddmrp::{
    AlertLevel, Buffer, BufferAlertTriggered, BufferCalculated, BufferHistory, BufferSizing,
    BufferStatusChanged, Zone, ZoneInputs, apply_adjusted_cpd, apply_buffer_adjustments,
    calculate_buffer_zones,
};

use super::{EngineError, EnginePorts, EngineResult};

/// Recomputes buffer zones from catalog data, the latest ADU and the active
/// adjustments, then persists and publishes the result.
#[derive(Debug, Clone)]
pub struct BufferRecalculator {
    ports: EnginePorts,
}

/// Result of one product inside a batch run.
#[derive(Debug, Clone, PartialEq)]
pub enum RecalculationOutcome {
    Recalculated {
        product_id: ProductId,
        buffer_id: BufferId,
        zone: Zone,
        alert_level: AlertLevel,
    },
    Failed {
        product_id: ProductId,
        error: EngineError,
    },
}

impl RecalculationOutcome {
    pub fn product_id(&self) -> ProductId {
        match self {
            RecalculationOutcome::Recalculated { product_id, .. }
            | RecalculationOutcome::Failed { product_id, .. } => *product_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RecalculationOutcome::Recalculated { .. })
    }
}

/// Per-product results of an organization-wide recalculation, in buffer order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecalculationReport {
    pub organization_id: OrganizationId,
    pub outcomes: Vec<RecalculationOutcome>,
}

impl BatchRecalculationReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (ProductId, &EngineError)> {
        self.outcomes.iter().filter_map(|o| match o {
            RecalculationOutcome::Failed { product_id, error } => Some((*product_id, error)),
            RecalculationOutcome::Recalculated { .. } => None,
        })
    }
}

impl BufferRecalculator {
    pub fn new(ports: EnginePorts) -> Self {
        Self { ports }
    }

    /// Recalculate one product's buffer, creating it on first run.
    ///
    /// Every dependency failure aborts the run. Nothing is published unless the
    /// buffer and its history snapshot were both persisted; if the snapshot
    /// fails, the buffer is put back the way it was.
    pub fn recalculate(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> EngineResult<Buffer> {
        let organization_id = organization_id.require("organization_id")?;
        let product_id = product_id.require("product_id")?;
        let ports = &self.ports;
        let now = ports.clock.now();
        let today = ports.clock.today();

        let product = ports
            .catalog
            .get_product(organization_id, product_id)
            .map_err(|e| EngineError::catalog("failed to get product from catalog", e))?;
        let profile_id = product.buffer_profile_id.ok_or_else(|| {
            EngineError::validation(format!("product {product_id} has no buffer profile assigned"))
        })?;
        let profile = ports
            .catalog
            .get_buffer_profile(organization_id, profile_id)
            .map_err(|e| EngineError::catalog("failed to get buffer profile", e))?;
        profile.validate()?;

        let adu = ports
            .adu
            .get_latest(organization_id, product_id)
            .map_err(|e| EngineError::store("failed to get latest ADU", e))?
            .ok_or_else(|| EngineError::not_found(format!("ADU for product {product_id}")))?;

        let fads = ports
            .demand_adjustments
            .list_active_for_date(organization_id, product_id, today)
            .map_err(|e| EngineError::store("failed to get active FADs", e))?;
        let cpd = apply_adjusted_cpd(adu.adu_value.ceil(), &fads);

        let supplier = ports
            .catalog
            .get_primary_supplier(organization_id, product_id)
            .map_err(|e| EngineError::catalog("failed to get primary supplier", e))?;

        let base_zones = calculate_buffer_zones(&ZoneInputs {
            cpd,
            ltd_days: supplier.lead_time_days,
            lead_time_factor: profile.lead_time_factor,
            variability_factor: profile.variability_factor,
            moq: supplier.moq,
            order_frequency_days: profile.order_frequency_days,
        });

        let existing = ports
            .buffers
            .get_by_product(organization_id, product_id)
            .map_err(|e| EngineError::store("failed to get buffer", e))?;
        let previous_zone = existing.as_ref().map(Buffer::zone);

        // A buffer that does not exist yet cannot have adjustments.
        let buffer_adjustments = match &existing {
            Some(b) => ports
                .buffer_adjustments
                .list_active_for_date(organization_id, b.id_typed(), today)
                .map_err(|e| EngineError::store("failed to get active buffer adjustments", e))?,
            None => Vec::new(),
        };
        let zones = apply_buffer_adjustments(&base_zones, &buffer_adjustments);
        let has_adjustments = !fads.is_empty() || !buffer_adjustments.is_empty();

        let sizing = BufferSizing {
            profile_id,
            cpd,
            ltd_days: supplier.lead_time_days,
            zones,
        };
        let buffer = match &existing {
            Some(current) => {
                let next = current.with_sizing(sizing, now)?;
                ports
                    .buffers
                    .save(next.clone())
                    .map_err(|e| EngineError::store("failed to save buffer", e))?;
                next
            }
            None => {
                let created = Buffer::new(BufferId::new(), product_id, organization_id, sizing, now)?;
                ports
                    .buffers
                    .create(created.clone())
                    .map_err(|e| EngineError::store("failed to save buffer", e))?;
                created
            }
        };

        let snapshot = BufferHistory::snapshot(
            BufferHistoryId::new(),
            &buffer,
            &profile,
            &supplier,
            has_adjustments,
            now,
        );
        if let Err(e) = ports.history.record(snapshot) {
            self.restore(existing.as_ref(), &buffer);
            return Err(EngineError::store("failed to create buffer history", e));
        }

        info!(
            organization = %organization_id,
            product = %product_id,
            buffer = %buffer.id_typed(),
            cpd,
            zone = %buffer.zone(),
            alert = %buffer.alert_level(),
            has_adjustments,
            "buffer recalculated"
        );

        publish_buffer_signals(ports, &buffer, previous_zone, true, now)?;
        Ok(buffer)
    }

    /// Recalculate every buffer of the organization, one product at a time.
    ///
    /// A failing product does not stop the sweep and does not fail the call:
    /// it is logged and reported in the returned outcomes. Only failing to
    /// list the organization's buffers is an error.
    pub fn recalculate_all(
        &self,
        organization_id: OrganizationId,
    ) -> EngineResult<BatchRecalculationReport> {
        let organization_id = organization_id.require("organization_id")?;
        let buffers = self
            .ports
            .buffers
            .list_all(organization_id)
            .map_err(|e| EngineError::store("failed to list buffers", e))?;

        let mut outcomes = Vec::with_capacity(buffers.len());
        for buffer in buffers {
            let product_id = buffer.product_id();
            let outcome = match self.recalculate(organization_id, product_id) {
                Ok(b) => RecalculationOutcome::Recalculated {
                    product_id,
                    buffer_id: b.id_typed(),
                    zone: b.zone(),
                    alert_level: b.alert_level(),
                },
                Err(error) => {
                    warn!(
                        organization = %organization_id,
                        product = %product_id,
                        error = %error,
                        "buffer recalculation failed; continuing"
                    );
                    RecalculationOutcome::Failed { product_id, error }
                }
            };
            outcomes.push(outcome);
        }

        let report = BatchRecalculationReport {
            organization_id,
            outcomes,
        };
        info!(
            organization = %organization_id,
            total = report.total(),
            failed = report.failed(),
            "batch recalculation finished"
        );
        Ok(report)
    }

    fn restore(&self, previous: Option<&Buffer>, written: &Buffer) {
        let result = match previous {
            Some(prev) => self.ports.buffers.save(prev.clone()),
            None => self
                .ports
                .buffers
                .delete(written.organization_id(), written.id_typed()),
        };
        if let Err(e) = result {
            error!(
                organization = %written.organization_id(),
                buffer = %written.id_typed(),
                error = %e,
                "failed to restore buffer after history failure"
            );
        }
    }
}

/// Publish what a buffer change means downstream.
///
/// `buffer.calculated` only for full recalculations; `buffer.status_changed`
/// when the zone moved (or the buffer is new); `buffer.alert_triggered` while
/// the buffer sits in red or below.
pub(crate) fn publish_buffer_signals(
    ports: &EnginePorts,
    buffer: &Buffer,
    previous_zone: Option<Zone>,
    recalculated: bool,
    at: DateTime<Utc>,
) -> EngineResult<()> {
    if recalculated {
        ports
            .publisher
            .publish(BufferCalculated::from_buffer(buffer, at).into())
            .map_err(|e| EngineError::publish("failed to publish buffer calculated event", e))?;
    }

    if previous_zone != Some(buffer.zone()) {
        info!(
            organization = %buffer.organization_id(),
            product = %buffer.product_id(),
            from = ?previous_zone,
            to = %buffer.zone(),
            "buffer zone changed"
        );
        ports
            .publisher
            .publish(BufferStatusChanged::from_buffer(buffer, previous_zone, at).into())
            .map_err(|e| EngineError::publish("failed to publish status changed event", e))?;
    }

    if buffer.alert_level().needs_replenishment() {
        let alert = BufferAlertTriggered::from_buffer(buffer, at);
        warn!(
            organization = %buffer.organization_id(),
            product = %buffer.product_id(),
            alert = %buffer.alert_level(),
            nfp = buffer.net_flow_position(),
            "{}",
            alert.message
        );
        ports
            .publisher
            .publish(alert.into())
            .map_err(|e| EngineError::publish("failed to publish alert event", e))?;
    } else {
        debug!(product = %buffer.product_id(), "buffer needs no replenishment");
    }

    Ok(())
}
