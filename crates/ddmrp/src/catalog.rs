//! Master data read from the product catalog. The engine never mutates these.

use serde::{Deserialize, Serialize};

use flowplan_core::{BufferProfileId, DomainError, DomainResult, OrganizationId, ProductId, SupplierId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub organization_id: OrganizationId,
    pub sku: String,
    pub name: String,
    /// Products without a profile cannot be buffered.
    pub buffer_profile_id: Option<BufferProfileId>,
}

/// Sizing factors shared by a family of buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferProfile {
    pub id: BufferProfileId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub lead_time_factor: f64,
    pub variability_factor: f64,
    pub order_frequency_days: u32,
}

impl BufferProfile {
    /// Factors must be finite and non-negative before they reach the zone calculator.
    pub fn validate(&self) -> DomainResult<()> {
        let factors = [
            ("lead_time_factor", self.lead_time_factor),
            ("variability_factor", self.variability_factor),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::validation(format!(
                    "profile {}: {name} must be a non-negative number",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Supplier terms for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSupplier {
    pub product_id: ProductId,
    pub supplier_id: SupplierId,
    pub lead_time_days: u32,
    pub moq: u32,
    pub is_primary: bool,
}
