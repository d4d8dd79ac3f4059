use std::sync::Arc;

use chrono::NaiveDate;

use flowplan_core::{BufferHistoryId, BufferId, OrganizationId, ProductId};
use flowplan_ddmrp::BufferHistory;

use super::StoreResult;
use super::table::Table;

/// Buffer history store. One snapshot per (buffer, snapshot date).
pub trait BufferHistoryStore: Send + Sync {
    /// Insert a snapshot, replacing any earlier snapshot of the same buffer and day.
    fn record(&self, snapshot: BufferHistory) -> StoreResult<()>;

    /// Newest first, at most `limit` rows.
    fn list_by_buffer(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
        limit: usize,
    ) -> StoreResult<Vec<BufferHistory>>;

    /// Snapshots with `from <= snapshot_date <= to`, oldest first.
    fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<BufferHistory>>;
}

impl<S> BufferHistoryStore for Arc<S>
where
    S: BufferHistoryStore + ?Sized,
{
    fn record(&self, snapshot: BufferHistory) -> StoreResult<()> {
        (**self).record(snapshot)
    }

    fn list_by_buffer(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
        limit: usize,
    ) -> StoreResult<Vec<BufferHistory>> {
        (**self).list_by_buffer(organization_id, buffer_id, limit)
    }

    fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<BufferHistory>> {
        (**self).list_by_product(organization_id, product_id, from, to)
    }
}

/// In-memory buffer history store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBufferHistoryStore {
    table: Table<BufferHistoryId, BufferHistory>,
}

impl InMemoryBufferHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BufferHistoryStore for InMemoryBufferHistoryStore {
    fn record(&self, snapshot: BufferHistory) -> StoreResult<()> {
        let mut map = self.table.write()?;
        map.retain(|_, h| {
            !(h.buffer_id == snapshot.buffer_id && h.snapshot_date == snapshot.snapshot_date)
        });
        map.insert(snapshot.id, snapshot);
        Ok(())
    }

    fn list_by_buffer(
        &self,
        organization_id: OrganizationId,
        buffer_id: BufferId,
        limit: usize,
    ) -> StoreResult<Vec<BufferHistory>> {
        let mut rows = self
            .table
            .filter(organization_id, |h| h.buffer_id == buffer_id)?;
        rows.sort_by(|a, b| b.snapshot_date.cmp(&a.snapshot_date));
        rows.truncate(limit);
        Ok(rows)
    }

    fn list_by_product(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<BufferHistory>> {
        let mut rows = self.table.filter(organization_id, |h| {
            h.product_id == product_id && h.snapshot_date >= from && h.snapshot_date <= to
        })?;
        rows.sort_by_key(|h| h.snapshot_date);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn test_snapshot(
        org: OrganizationId,
        buffer_id: BufferId,
        product_id: ProductId,
        day_offset: i64,
        cpd: f64,
    ) -> BufferHistory {
        let at = Utc.with_ymd_and_hms(2024, 4, 1, 2, 0, 0).unwrap() + Duration::days(day_offset);
        BufferHistory {
            id: BufferHistoryId::new(),
            buffer_id,
            product_id,
            organization_id: org,
            snapshot_date: at.date_naive(),
            cpd,
            ltd_days: 10,
            red_base: 0.0,
            red_safety: 0.0,
            red_zone: 0.0,
            yellow_zone: 0.0,
            green_zone: 0.0,
            lead_time_factor: 0.5,
            variability_factor: 0.5,
            moq: 0,
            order_frequency_days: 7,
            has_adjustments: false,
            created_at: at,
        }
    }

    #[test]
    fn same_day_snapshot_is_replaced() {
        let store = InMemoryBufferHistoryStore::new();
        let org = OrganizationId::new();
        let buffer = BufferId::new();
        let product = ProductId::new();

        store.record(test_snapshot(org, buffer, product, 0, 10.0)).unwrap();
        store.record(test_snapshot(org, buffer, product, 0, 12.0)).unwrap();

        let rows = store.list_by_buffer(org, buffer, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cpd, 12.0);
    }

    #[test]
    fn listing_orders_and_bounds() {
        let store = InMemoryBufferHistoryStore::new();
        let org = OrganizationId::new();
        let buffer = BufferId::new();
        let product = ProductId::new();
        for offset in 0..5 {
            store
                .record(test_snapshot(org, buffer, product, offset, offset as f64))
                .unwrap();
        }

        let newest: Vec<f64> = store
            .list_by_buffer(org, buffer, 2)
            .unwrap()
            .iter()
            .map(|h| h.cpd)
            .collect();
        assert_eq!(newest, vec![4.0, 3.0]);

        let from = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 4, 4).unwrap();
        let range: Vec<f64> = store
            .list_by_product(org, product, from, to)
            .unwrap()
            .iter()
            .map(|h| h.cpd)
            .collect();
        assert_eq!(range, vec![1.0, 2.0, 3.0]);

        assert!(store
            .list_by_product(OrganizationId::new(), product, from, to)
            .unwrap()
            .is_empty());
    }
}
