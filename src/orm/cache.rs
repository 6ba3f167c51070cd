use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::ObjectId;
use crate::orm::{Entity, Persistable};

/// Outcome of an upsert: whether the identifier was unseen or replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheUpdate {
    Inserted,
    Replaced,
}

/// In-memory index of the latest known entity per identifier.
///
/// At most one entry per identifier; entries are replaced wholesale
/// (last-write-wins, no version check), never merged. No eviction, no
/// capacity bound, no expiry; contents live until an explicit remove or
/// process exit. A mutex guards the map — it protects the structure, not
/// the ordering of concurrent operations on the same identifier.
pub struct ObjectCache<M: Persistable> {
    entries: Mutex<HashMap<ObjectId, Entity<M>>>,
}

impl<M: Persistable> ObjectCache<M> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts or replaces the entry for the entity's identifier.
    pub fn upsert(&self, entity: Entity<M>) -> CacheUpdate {
        let mut entries = self.entries.lock().unwrap();
        match entries.insert(entity.id().clone(), entity) {
            None => CacheUpdate::Inserted,
            Some(_) => CacheUpdate::Replaced,
        }
    }

    /// Removes the entry for `id`; no-op when absent.
    pub fn remove(&self, id: &ObjectId) -> bool {
        self.entries.lock().unwrap().remove(id).is_some()
    }

    pub fn get(&self, id: &ObjectId) -> Option<Entity<M>> {
        self.entries.lock().unwrap().get(id).cloned()
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.entries.lock().unwrap().contains_key(id)
    }

    /// Snapshot of every cached entity, in no particular order.
    pub fn all(&self) -> Vec<Entity<M>> {
        self.entries.lock().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
