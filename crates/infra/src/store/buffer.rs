use std::sync::Arc;

use flowplan_core::{BufferId, OrganizationId, ProductId};
use flowplan_ddmrp::{AlertLevel, Buffer, Zone};

use super::table::Table;
use super::{StoreError, StoreResult};

/// Buffer store. One buffer per (organization, product).
pub trait BufferStore: Send + Sync {
    /// Fails with `Conflict` if the id or the (organization, product) pair is taken.
    fn create(&self, buffer: Buffer) -> StoreResult<()>;

    /// Overwrite an existing buffer (last writer wins).
    fn save(&self, buffer: Buffer) -> StoreResult<()>;

    fn get(&self, organization_id: OrganizationId, id: BufferId) -> StoreResult<Option<Buffer>>;

    fn get_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Option<Buffer>>;

    /// All buffers of an organization, oldest first.
    fn list_all(&self, organization_id: OrganizationId) -> StoreResult<Vec<Buffer>>;

    fn list_by_zone(&self, organization_id: OrganizationId, zone: Zone) -> StoreResult<Vec<Buffer>>;

    fn list_by_alert_level(
        &self,
        organization_id: OrganizationId,
        alert_level: AlertLevel,
    ) -> StoreResult<Vec<Buffer>>;

    fn delete(&self, organization_id: OrganizationId, id: BufferId) -> StoreResult<()>;
}

impl<S> BufferStore for Arc<S>
where
    S: BufferStore + ?Sized,
{
    fn create(&self, buffer: Buffer) -> StoreResult<()> {
        (**self).create(buffer)
    }

    fn save(&self, buffer: Buffer) -> StoreResult<()> {
        (**self).save(buffer)
    }

    fn get(&self, organization_id: OrganizationId, id: BufferId) -> StoreResult<Option<Buffer>> {
        (**self).get(organization_id, id)
    }

    fn get_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Option<Buffer>> {
        (**self).get_by_product(organization_id, product_id)
    }

    fn list_all(&self, organization_id: OrganizationId) -> StoreResult<Vec<Buffer>> {
        (**self).list_all(organization_id)
    }

    fn list_by_zone(&self, organization_id: OrganizationId, zone: Zone) -> StoreResult<Vec<Buffer>> {
        (**self).list_by_zone(organization_id, zone)
    }

    fn list_by_alert_level(
        &self,
        organization_id: OrganizationId,
        alert_level: AlertLevel,
    ) -> StoreResult<Vec<Buffer>> {
        (**self).list_by_alert_level(organization_id, alert_level)
    }

    fn delete(&self, organization_id: OrganizationId, id: BufferId) -> StoreResult<()> {
        (**self).delete(organization_id, id)
    }
}

/// In-memory buffer store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBufferStore {
    table: Table<BufferId, Buffer>,
}

impl InMemoryBufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted<F>(&self, organization_id: OrganizationId, pred: F) -> StoreResult<Vec<Buffer>>
    where
        F: Fn(&Buffer) -> bool,
    {
        let mut rows = self.table.filter(organization_id, pred)?;
        rows.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then(a.id_typed().cmp(&b.id_typed()))
        });
        Ok(rows)
    }
}

impl BufferStore for InMemoryBufferStore {
    fn create(&self, buffer: Buffer) -> StoreResult<()> {
        let mut map = self.table.write()?;
        let taken = map.values().any(|b| {
            b.organization_id() == buffer.organization_id() && b.product_id() == buffer.product_id()
        });
        if taken || map.contains_key(&buffer.id_typed()) {
            return Err(StoreError::Conflict(format!(
                "buffer already exists for product {}",
                buffer.product_id()
            )));
        }
        map.insert(buffer.id_typed(), buffer);
        Ok(())
    }

    fn save(&self, buffer: Buffer) -> StoreResult<()> {
        self.table.replace(buffer.id_typed(), buffer)
    }

    fn get(&self, organization_id: OrganizationId, id: BufferId) -> StoreResult<Option<Buffer>> {
        self.table.get(organization_id, &id)
    }

    fn get_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Option<Buffer>> {
        Ok(self
            .table
            .filter(organization_id, |b| b.product_id() == product_id)?
            .into_iter()
            .next())
    }

    fn list_all(&self, organization_id: OrganizationId) -> StoreResult<Vec<Buffer>> {
        self.sorted(organization_id, |_| true)
    }

    fn list_by_zone(&self, organization_id: OrganizationId, zone: Zone) -> StoreResult<Vec<Buffer>> {
        self.sorted(organization_id, |b| b.zone() == zone)
    }

    fn list_by_alert_level(
        &self,
        organization_id: OrganizationId,
        alert_level: AlertLevel,
    ) -> StoreResult<Vec<Buffer>> {
        self.sorted(organization_id, |b| b.alert_level() == alert_level)
    }

    fn delete(&self, organization_id: OrganizationId, id: BufferId) -> StoreResult<()> {
        self.table.remove(organization_id, &id).map(|_| ())
    }
}
