//! Read-only catalog collaborator: products, buffer profiles, suppliers.
//!
//! The engine never mutates catalog data. The in-memory adapter is seeded by
//! tests and local tooling.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use flowplan_core::{BufferProfileId, OrganizationId, ProductId};
use flowplan_ddmrp::{BufferProfile, Product, ProductSupplier};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog lookups, all keyed by organization.
pub trait CatalogClient: Send + Sync {
    fn get_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> CatalogResult<Product>;

    fn get_buffer_profile(
        &self,
        organization_id: OrganizationId,
        profile_id: BufferProfileId,
    ) -> CatalogResult<BufferProfile>;

    /// The supplier flagged primary for the product.
    fn get_primary_supplier(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> CatalogResult<ProductSupplier>;
}

impl<C> CatalogClient for Arc<C>
where
    C: CatalogClient + ?Sized,
{
    fn get_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> CatalogResult<Product> {
        (**self).get_product(organization_id, product_id)
    }

    fn get_buffer_profile(
        &self,
        organization_id: OrganizationId,
        profile_id: BufferProfileId,
    ) -> CatalogResult<BufferProfile> {
        (**self).get_buffer_profile(organization_id, profile_id)
    }

    fn get_primary_supplier(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> CatalogResult<ProductSupplier> {
        (**self).get_primary_supplier(organization_id, product_id)
    }
}

#[derive(Debug, Default)]
struct CatalogData {
    products: HashMap<ProductId, Product>,
    profiles: HashMap<BufferProfileId, BufferProfile>,
    suppliers: HashMap<ProductId, Vec<ProductSupplier>>,
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    inner: RwLock<CatalogData>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_product(&self, product: Product) -> CatalogResult<()> {
        self.write()?.products.insert(product.id, product);
        Ok(())
    }

    pub fn upsert_profile(&self, profile: BufferProfile) -> CatalogResult<()> {
        self.write()?.profiles.insert(profile.id, profile);
        Ok(())
    }

    /// Replaces any supplier link with the same supplier id.
    pub fn upsert_supplier(&self, supplier: ProductSupplier) -> CatalogResult<()> {
        let mut data = self.write()?;
        let links = data.suppliers.entry(supplier.product_id).or_default();
        links.retain(|s| s.supplier_id != supplier.supplier_id);
        links.push(supplier);
        Ok(())
    }

    pub fn remove_product(&self, product_id: ProductId) -> CatalogResult<()> {
        self.write()?.products.remove(&product_id);
        Ok(())
    }

    fn read(&self) -> CatalogResult<std::sync::RwLockReadGuard<'_, CatalogData>> {
        self.inner
            .read()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".into()))
    }

    fn write(&self) -> CatalogResult<std::sync::RwLockWriteGuard<'_, CatalogData>> {
        self.inner
            .write()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".into()))
    }
}

impl CatalogClient for InMemoryCatalog {
    fn get_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> CatalogResult<Product> {
        self.read()?
            .products
            .get(&product_id)
            .filter(|p| p.organization_id == organization_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("product {product_id}")))
    }

    fn get_buffer_profile(
        &self,
        organization_id: OrganizationId,
        profile_id: BufferProfileId,
    ) -> CatalogResult<BufferProfile> {
        self.read()?
            .profiles
            .get(&profile_id)
            .filter(|p| p.organization_id == organization_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("buffer profile {profile_id}")))
    }

    fn get_primary_supplier(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> CatalogResult<ProductSupplier> {
        let data = self.read()?;
        let owned = data
            .products
            .get(&product_id)
            .is_some_and(|p| p.organization_id == organization_id);
        if !owned {
            return Err(CatalogError::NotFound(format!("product {product_id}")));
        }
        data.suppliers
            .get(&product_id)
            .and_then(|links| links.iter().find(|s| s.is_primary))
            .cloned()
            .ok_or_else(|| {
                CatalogError::NotFound(format!("primary supplier for product {product_id}"))
            })
    }
}
