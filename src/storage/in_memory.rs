//! In-memory implementation of Store for testing and development

use crate::core::resource::Resource;
use crate::core::store::Store;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

/// In-memory resource store
///
/// Records live in a `BTreeMap` keyed by id, so natural order is id order.
/// Clones share the same data. Uses RwLock for thread-safe access.
pub struct InMemoryStore<E> {
    records: Arc<RwLock<BTreeMap<i64, E>>>,
    /// Next id to hand out; `i64::MAX` once the id space is used up
    next_id: Arc<AtomicI64>,
}

impl<E> Clone for InMemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<E: Resource> InMemoryStore<E> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Store pre-populated with `records`.
    ///
    /// Records that already carry an id keep it; the rest get the next free
    /// one. Records left over once the id space is used up are skipped.
    pub fn seeded(records: impl IntoIterator<Item = E>) -> Self {
        let mut map = BTreeMap::new();
        let mut pending = Vec::new();
        for record in records {
            match record.id() {
                Some(id) => {
                    map.insert(id, record);
                }
                None => pending.push(record),
            }
        }

        let mut next_id = map.keys().next_back().map_or(1, |last| last.saturating_add(1));
        for mut record in pending {
            if next_id == i64::MAX {
                tracing::warn!(resource = E::resource_name(), "no ids left, skipping seed record");
                continue;
            }
            record.set_id(next_id);
            map.insert(next_id, record);
            next_id += 1;
        }

        Self {
            records: Arc::new(RwLock::new(map)),
            next_id: Arc::new(AtomicI64::new(next_id)),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> Result<usize> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl<E: Resource> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Resource> Store<E> for InMemoryStore<E> {
    async fn all(&self) -> Result<Vec<E>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.values().cloned().collect())
    }

    async fn find(&self, id: i64) -> Result<Option<E>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<E>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.values().find(|r| r.slug() == Some(slug)).cloned())
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<E>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(ids.iter().filter_map(|id| records.get(id)).cloned().collect())
    }

    async fn insert(&self, mut entity: E) -> Result<E> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let id = match entity.id() {
            Some(id) if records.contains_key(&id) => {
                return Err(anyhow!("{} {} already exists", E::resource_name_singular(), id));
            }
            Some(id) => {
                self.next_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
                id
            }
            None => self
                .next_id
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    if n == i64::MAX { None } else { n.checked_add(1) }
                })
                .map_err(|_| anyhow!("no {} ids left", E::resource_name_singular()))?,
        };

        entity.set_id(id);
        records.insert(id, entity.clone());

        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let id = entity
            .id()
            .ok_or_else(|| anyhow!("cannot update an unsaved {}", E::resource_name_singular()))?;
        let slot = records
            .get_mut(&id)
            .ok_or_else(|| anyhow!("{} {} not found", E::resource_name_singular(), id))?;
        *slot = entity.clone();

        Ok(entity)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records.remove(&id);

        Ok(())
    }
}
