use std::sync::Arc;

use chrono::NaiveDate;

use flowplan_core::{AduCalculationId, OrganizationId, ProductId};
use flowplan_ddmrp::AduCalculation;

use super::table::Table;
use super::{StoreError, StoreResult};

/// ADU snapshot store. Snapshots are append-only.
pub trait AduStore: Send + Sync {
    /// Fails with `Conflict` when a snapshot already exists for the same
    /// (organization, product, calculation date).
    fn create(&self, calculation: AduCalculation) -> StoreResult<()>;

    /// Most recent snapshot by calculation date.
    fn get_latest(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Option<AduCalculation>>;

    fn get_by_date(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        date: NaiveDate,
    ) -> StoreResult<Option<AduCalculation>>;

    /// Newest first, at most `limit` rows.
    fn list_history(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        limit: usize,
    ) -> StoreResult<Vec<AduCalculation>>;
}

impl<S> AduStore for Arc<S>
where
    S: AduStore + ?Sized,
{
    fn create(&self, calculation: AduCalculation) -> StoreResult<()> {
        (**self).create(calculation)
    }

    fn get_latest(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Option<AduCalculation>> {
        (**self).get_latest(organization_id, product_id)
    }

    fn get_by_date(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        date: NaiveDate,
    ) -> StoreResult<Option<AduCalculation>> {
        (**self).get_by_date(organization_id, product_id, date)
    }

    fn list_history(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        limit: usize,
    ) -> StoreResult<Vec<AduCalculation>> {
        (**self).list_history(organization_id, product_id, limit)
    }
}

/// In-memory ADU store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAduStore {
    table: Table<AduCalculationId, AduCalculation>,
}

impl InMemoryAduStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Vec<AduCalculation>> {
        let mut rows = self
            .table
            .filter(organization_id, |c| c.product_id == product_id)?;
        rows.sort_by(|a, b| {
            b.calculation_date
                .cmp(&a.calculation_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(rows)
    }
}

impl AduStore for InMemoryAduStore {
    fn create(&self, calculation: AduCalculation) -> StoreResult<()> {
        let mut map = self.table.write()?;
        let duplicate = map.values().any(|c| {
            c.organization_id == calculation.organization_id
                && c.product_id == calculation.product_id
                && c.calculation_date == calculation.calculation_date
        });
        if duplicate || map.contains_key(&calculation.id) {
            return Err(StoreError::Conflict(format!(
                "ADU already calculated for product {} on {}",
                calculation.product_id, calculation.calculation_date
            )));
        }
        map.insert(calculation.id, calculation);
        Ok(())
    }

    fn get_latest(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
    ) -> StoreResult<Option<AduCalculation>> {
        Ok(self
            .newest_first(organization_id, product_id)?
            .into_iter()
            .next())
    }

    fn get_by_date(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        date: NaiveDate,
    ) -> StoreResult<Option<AduCalculation>> {
        Ok(self
            .table
            .filter(organization_id, |c| {
                c.product_id == product_id && c.calculation_date == date
            })?
            .into_iter()
            .next())
    }

    fn list_history(
        &self,
        organization_id: OrganizationId,
        product_id: ProductId,
        limit: usize,
    ) -> StoreResult<Vec<AduCalculation>> {
        let mut rows = self.newest_first(organization_id, product_id)?;
        rows.truncate(limit);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use flowplan_ddmrp::AduMethod;

    fn test_calc(org: OrganizationId, product: ProductId, day_offset: i64, value: f64) -> AduCalculation {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::days(day_offset);
        AduCalculation {
            id: AduCalculationId::new(),
            product_id: product,
            organization_id: org,
            calculation_date: at.date_naive(),
            adu_value: value,
            method: AduMethod::Average,
            period_days: 30,
            created_at: at,
        }
    }

    #[test]
    fn latest_is_by_calculation_date() {
        let store = InMemoryAduStore::new();
        let org = OrganizationId::new();
        let product = ProductId::new();

        store.create(test_calc(org, product, 2, 30.0)).unwrap();
        store.create(test_calc(org, product, 0, 10.0)).unwrap();
        store.create(test_calc(org, product, 1, 20.0)).unwrap();

        let latest = store.get_latest(org, product).unwrap().unwrap();
        assert_eq!(latest.adu_value, 30.0);

        let history = store.list_history(org, product, 2).unwrap();
        let values: Vec<f64> = history.iter().map(|c| c.adu_value).collect();
        assert_eq!(values, vec![30.0, 20.0]);
    }

    #[test]
    fn second_calculation_on_same_day_conflicts() {
        let store = InMemoryAduStore::new();
        let org = OrganizationId::new();
        let product = ProductId::new();

        store.create(test_calc(org, product, 0, 10.0)).unwrap();
        let err = store.create(test_calc(org, product, 0, 11.0)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn lookups_are_organization_scoped() {
        let store = InMemoryAduStore::new();
        let org = OrganizationId::new();
        let product = ProductId::new();
        let calc = test_calc(org, product, 0, 10.0);
        let day = calc.calculation_date;
        store.create(calc).unwrap();

        let other = OrganizationId::new();
        assert_eq!(store.get_latest(other, product).unwrap(), None);
        assert_eq!(store.get_by_date(other, product, day).unwrap(), None);
        assert!(store.get_by_date(org, product, day).unwrap().is_some());
    }
}
