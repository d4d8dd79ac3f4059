use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use flowplan_core::{AdjustmentId, BufferId, OrganizationId, ProductId};
use flowplan_ddmrp::{BufferAdjustment, DemandAdjustment};

use super::StoreResult;
use super::table::Table;

/// Demand adjustment (FAD) store.
pub trait DemandAdjustmentStore: Send + Sync {
    fn create(&self, adjustment: DemandAdjustment) -> StoreResult<()>;

    fn update(&self, adjustment: DemandAdjustment) -> StoreResult<()>;

    fn get(
        &self,
        organization_id: OrganizationId,
        id: AdjustmentId,
    ) -> StoreResult<Option<DemandAdjustment>>;

    /// Adjustments of a product whose window contains `date` (calendar-day inclusive).
    fn list_active_for_date(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        date: NaiveDate,
    ) -> StoreResult<Vec<DemandAdjustment>>;

    fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Vec<DemandAdjustment>>;

    fn list_by_organization(
        &self,
        organization_id: OrganizationId,
    ) -> StoreResult<Vec<DemandAdjustment>>;

    fn delete(&self, organization_id: OrganizationId, id: AdjustmentId) -> StoreResult<()>;
}

/// Buffer adjustment store.
pub trait BufferAdjustmentStore: Send + Sync {
    fn create(&self, adjustment: BufferAdjustment) -> StoreResult<()>;

    fn update(&self, adjustment: BufferAdjustment) -> StoreResult<()>;

    fn get(
        &self,
        organization_id: OrganizationId,
        id: AdjustmentId,
    ) -> StoreResult<Option<BufferAdjustment>>;

    /// Adjustments of a buffer whose window contains `date` (calendar-day inclusive).
    fn list_active_for_date(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
        date: NaiveDate,
    ) -> StoreResult<Vec<BufferAdjustment>>;

    fn list_by_buffer(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
    ) -> StoreResult<Vec<BufferAdjustment>>;

    fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Vec<BufferAdjustment>>;

    fn delete(&self, organization_id: OrganizationId, id: AdjustmentId) -> StoreResult<()>;
}

impl<S> DemandAdjustmentStore for Arc<S>
where
    S: DemandAdjustmentStore + ?Sized,
{
    fn create(&self, adjustment: DemandAdjustment) -> StoreResult<()> {
        (**self).create(adjustment)
    }

    fn update(&self, adjustment: DemandAdjustment) -> StoreResult<()> {
        (**self).update(adjustment)
    }

    fn get(
        &self,
        organization_id: OrganizationId,
        id: AdjustmentId,
    ) -> StoreResult<Option<DemandAdjustment>> {
        (**self).get(organization_id, id)
    }

    fn list_active_for_date(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        date: NaiveDate,
    ) -> StoreResult<Vec<DemandAdjustment>> {
        (**self).list_active_for_date(organization_id, product_id, date)
    }

    fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Vec<DemandAdjustment>> {
        (**self).list_by_product(organization_id, product_id)
    }

    fn list_by_organization(
        &self,
        organization_id: OrganizationId,
    ) -> StoreResult<Vec<DemandAdjustment>> {
        (**self).list_by_organization(organization_id)
    }

    fn delete(&self, organization_id: OrganizationId, id: AdjustmentId) -> StoreResult<()> {
        (**self).delete(organization_id, id)
    }
}

impl<S> BufferAdjustmentStore for Arc<S>
where
    S: BufferAdjustmentStore + ?Sized,
{
    fn create(&self, adjustment: BufferAdjustment) -> StoreResult<()> {
        (**self).create(adjustment)
    }

    fn update(&self, adjustment: BufferAdjustment) -> StoreResult<()> {
        (**self).update(adjustment)
    }

    fn get(
        &self,
        organization_id: OrganizationId,
        id: AdjustmentId,
    ) -> StoreResult<Option<BufferAdjustment>> {
        (**self).get(organization_id, id)
    }

    fn list_active_for_date(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
        date: NaiveDate,
    ) -> StoreResult<Vec<BufferAdjustment>> {
        (**self).list_active_for_date(organization_id, buffer_id, date)
    }

    fn list_by_buffer(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
    ) -> StoreResult<Vec<BufferAdjustment>> {
        (**self).list_by_buffer(organization_id, buffer_id)
    }

    fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Vec<BufferAdjustment>> {
        (**self).list_by_product(organization_id, product_id)
    }

    fn delete(&self, organization_id: OrganizationId, id: AdjustmentId) -> StoreResult<()> {
        (**self).delete(organization_id, id)
    }
}

/// Orders adjustments by window start, ties broken by id.
fn by_start_date<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: FnMut(&T) -> (DateTime<Utc>, AdjustmentId),
{
    rows.sort_by_key(key);
    rows
}

/// In-memory demand adjustment store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDemandAdjustmentStore {
    table: Table<AdjustmentId, DemandAdjustment>,
}

impl InMemoryDemandAdjustmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted<F>(&self, organization_id: OrganizationId, pred: F) -> StoreResult<Vec<DemandAdjustment>>
    where
        F: Fn(&DemandAdjustment) -> bool,
    {
        let rows = self.table.filter(organization_id, pred)?;
        Ok(by_start_date(rows, |a| (a.window.start(), a.id)))
    }
}

impl DemandAdjustmentStore for InMemoryDemandAdjustmentStore {
    fn create(&self, adjustment: DemandAdjustment) -> StoreResult<()> {
        self.table.insert_new(adjustment.id, adjustment)
    }

    fn update(&self, adjustment: DemandAdjustment) -> StoreResult<()> {
        self.table.replace(adjustment.id, adjustment)
    }

    fn get(
        &self,
        organization_id: OrganizationId,
        id: AdjustmentId,
    ) -> StoreResult<Option<DemandAdjustment>> {
        self.table.get(organization_id, &id)
    }

    fn list_active_for_date(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        date: NaiveDate,
    ) -> StoreResult<Vec<DemandAdjustment>> {
        self.sorted(organization_id, |a| {
            a.product_id == product_id && a.is_active_on(date)
        })
    }

    fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Vec<DemandAdjustment>> {
        self.sorted(organization_id, |a| a.product_id == product_id)
    }

    fn list_by_organization(
        &self,
        organization_id: OrganizationId,
    ) -> StoreResult<Vec<DemandAdjustment>> {
        self.sorted(organization_id, |_| true)
    }

    fn delete(&self, organization_id: OrganizationId, id: AdjustmentId) -> StoreResult<()> {
        self.table.remove(organization_id, &id).map(|_| ())
    }
}

/// In-memory buffer adjustment store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBufferAdjustmentStore {
    table: Table<AdjustmentId, BufferAdjustment>,
}

impl InMemoryBufferAdjustmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted<F>(&self, organization_id: OrganizationId, pred: F) -> StoreResult<Vec<BufferAdjustment>>
    where
        F: Fn(&BufferAdjustment) -> bool,
    {
        let rows = self.table.filter(organization_id, pred)?;
        Ok(by_start_date(rows, |a| (a.window.start(), a.id)))
    }
}

impl BufferAdjustmentStore for InMemoryBufferAdjustmentStore {
    fn create(&self, adjustment: BufferAdjustment) -> StoreResult<()> {
        self.table.insert_new(adjustment.id, adjustment)
    }

    fn update(&self, adjustment: BufferAdjustment) -> StoreResult<()> {
        self.table.replace(adjustment.id, adjustment)
    }

    fn get(
        &self,
        organization_id: OrganizationId,
        id: AdjustmentId,
    ) -> StoreResult<Option<BufferAdjustment>> {
        self.table.get(organization_id, &id)
    }

    fn list_active_for_date(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
        date: NaiveDate,
    ) -> StoreResult<Vec<BufferAdjustment>> {
        self.sorted(organization_id, |a| a.buffer_id == buffer_id && a.is_active_on(date))
    }

    fn list_by_buffer(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
    ) -> StoreResult<Vec<BufferAdjustment>> {
        self.sorted(organization_id, |a| a.buffer_id == buffer_id)
    }

    fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Vec<BufferAdjustment>> {
        self.sorted(organization_id, |a| a.product_id == product_id)
    }

    fn delete(&self, organization_id: OrganizationId, id: AdjustmentId) -> StoreResult<()> {
        self.table.remove(organization_id, &id).map(|_| ())
    }
}
