use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use flowplan_core::OrganizationId;
use flowplan_events::OrganizationScoped;

use super::{StoreError, StoreResult};

/// Organization-checked map shared by the in-memory stores.
#[derive(Debug)]
pub(crate) struct Table<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Table<K, V>
where
    K: Eq + Hash + Clone + core::fmt::Display,
    V: Clone + OrganizationScoped,
{
    pub(crate) fn read(&self) -> StoreResult<RwLockReadGuard<'_, HashMap<K, V>>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))
    }

    pub(crate) fn write(&self) -> StoreResult<RwLockWriteGuard<'_, HashMap<K, V>>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".into()))
    }

    pub(crate) fn get(&self, organization_id: OrganizationId, key: &K) -> StoreResult<Option<V>> {
        match self.read()?.get(key) {
            Some(v) if v.belongs_to(organization_id) => Ok(Some(v.clone())),
            Some(_) => Err(StoreError::OrganizationIsolation),
            None => Ok(None),
        }
    }

    pub(crate) fn insert_new(&self, key: K, value: V) -> StoreResult<()> {
        let mut map = self.write()?;
        if map.contains_key(&key) {
            return Err(StoreError::Conflict(format!("record already exists: {key}")));
        }
        map.insert(key, value);
        Ok(())
    }

    pub(crate) fn replace(&self, key: K, value: V) -> StoreResult<()> {
        let mut map = self.write()?;
        match map.get(&key) {
            Some(existing) if existing.belongs_to(value.organization_id()) => {
                map.insert(key, value);
                Ok(())
            }
            Some(_) => Err(StoreError::OrganizationIsolation),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    pub(crate) fn remove(&self, organization_id: OrganizationId, key: &K) -> StoreResult<V> {
        let mut map = self.write()?;
        match map.get(key) {
            Some(v) if v.belongs_to(organization_id) => {
                map.remove(key).ok_or_else(|| StoreError::NotFound(key.to_string()))
            }
            Some(_) => Err(StoreError::OrganizationIsolation),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    /// Every record of `organization_id` matching `pred`, in unspecified order.
    pub(crate) fn filter<F>(&self, organization_id: OrganizationId, pred: F) -> StoreResult<Vec<V>>
    where
        F: Fn(&V) -> bool,
    {
        Ok(self
            .read()?
            .values()
            .filter(|v| v.belongs_to(organization_id) && pred(v))
            .cloned()
            .collect())
    }
}
