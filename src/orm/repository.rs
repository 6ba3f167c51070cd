use std::sync::Arc;

use futures::future::join_all;

use crate::error::{failed_precondition, OrmResult};
use crate::model::{CollectionId, DocumentKey, ObjectId, Record};
use crate::orm::cache::{CacheUpdate, ObjectCache};
use crate::orm::events::{ChangeEvent, ChangeKind, Notifier};
use crate::orm::{Entity, Lifecycle, MutationPolicy, Persistable};
use crate::store::{DocumentStore, Predicate, WriteBatch};

/// Persistence handle for one model type.
///
/// Owns the model type's object cache and notification hub, and drives every
/// fetch/save/delete against the backing store. Obtain one per model type
/// through [`Orm::repository`](crate::orm::Orm::repository).
///
/// Under the default [`MutationPolicy::Optimistic`], cache membership and
/// notifications change before the remote confirms — a failed remote call
/// leaves cache and store briefly inconsistent. [`MutationPolicy::Confirmed`]
/// defers both until the round-trip succeeds.
pub struct Repository<M: Persistable> {
    store: Arc<dyn DocumentStore>,
    policy: MutationPolicy,
    collection: CollectionId,
    cache: ObjectCache<M>,
    notifier: Notifier,
}

impl<M: Persistable> std::fmt::Debug for Repository<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("policy", &self.policy)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl<M: Persistable> Repository<M> {
    pub(crate) fn new(store: Arc<dyn DocumentStore>, policy: MutationPolicy) -> OrmResult<Self> {
        // Collection resolution fails fast, before any store call.
        let collection = CollectionId::new(M::collection())?;
        Ok(Self {
            store,
            policy,
            collection,
            cache: ObjectCache::new(),
            notifier: Notifier::new(M::channels()),
        })
    }

    pub fn collection(&self) -> &CollectionId {
        &self.collection
    }

    pub fn policy(&self) -> MutationPolicy {
        self.policy
    }

    /// Subscribes to this model type's change events.
    pub fn subscribe(&self) -> async_channel::Receiver<ChangeEvent> {
        self.notifier.subscribe()
    }

    /// Wraps a fresh model under a generated identifier, inserts it into the
    /// cache and announces it on the added channel.
    pub fn create(&self, model: M) -> Entity<M> {
        let entity = Entity::new_local(model);
        self.cache.upsert(entity.clone());
        self.notifier.publish(ChangeKind::Added);
        entity
    }

    /// Queries the store, refreshing the cache with every returned record.
    ///
    /// Records whose identifier is already cached replace the cached entry
    /// silently; unseen identifiers are inserted and announced with a single
    /// `Added` event for the whole call, fired only when at least one unseen
    /// identifier arrived. The full fetched list is returned either way.
    pub async fn fetch(&self, predicate: Option<&Predicate>) -> OrmResult<Vec<Entity<M>>> {
        let records = self.store.query(&self.collection, predicate).await?;

        let mut fetched = Vec::with_capacity(records.len());
        let mut newly_seen = 0usize;
        for record in &records {
            let entity = self.entity_from_record(record)?;
            if self.cache.upsert(entity.clone()) == CacheUpdate::Inserted {
                newly_seen += 1;
            }
            fetched.push(entity);
        }

        log::debug!(
            "fetched {} record(s) from {} ({} unseen)",
            fetched.len(),
            self.collection,
            newly_seen
        );
        if newly_seen > 0 {
            self.notifier.publish(ChangeKind::Added);
        }
        Ok(fetched)
    }

    /// Serializes the entity and writes it immediately (merge semantics).
    ///
    /// The first successful save flips the lifecycle to `Persisted`. The
    /// announcement is `Added` for a first save, `Edited` afterwards; under
    /// the optimistic policy it fires before the write confirms.
    pub async fn save(&self, entity: &mut Entity<M>) -> OrmResult<()> {
        if entity.lifecycle() == Lifecycle::Deleted {
            return Err(failed_precondition(format!(
                "Cannot save deleted entity {}",
                entity.id()
            )));
        }

        let fields = entity.model().to_fields()?;
        let key = self.key_for(entity.id());
        let was_new = entity.is_new();

        // The cache holds the latest known value for this identifier.
        self.cache.upsert(entity.clone());
        if self.policy == MutationPolicy::Optimistic {
            self.publish_saved(was_new);
        }

        if let Err(err) = self.store.set(&key, fields, true).await {
            log::warn!("save of {key} failed: {err}");
            return Err(err);
        }

        entity.mark_persisted();
        self.cache.upsert(entity.clone());
        if self.policy == MutationPolicy::Confirmed {
            self.publish_saved(was_new);
        }
        Ok(())
    }

    /// Stages the entity's save into a caller-supplied batch.
    ///
    /// No notification fires and the lifecycle is untouched; the caller
    /// controls the commit.
    pub fn stage_save(&self, entity: &Entity<M>, batch: &mut WriteBatch) -> OrmResult<()> {
        let fields = entity.model().to_fields()?;
        batch.set(self.key_for(entity.id()), fields, true)?;
        Ok(())
    }

    /// Deletes the entity from the store.
    ///
    /// Under the optimistic policy the cache entry is removed and `Removed`
    /// fires before the remote call is issued. On success the model's
    /// `delete_complete` hook runs before the call returns.
    pub async fn delete(&self, entity: &mut Entity<M>) -> OrmResult<()> {
        let key = self.key_for(entity.id());

        if self.policy == MutationPolicy::Optimistic {
            self.cache.remove(entity.id());
            self.notifier.publish(ChangeKind::Removed);
        }

        if let Err(err) = self.store.delete(&key).await {
            // Optimistic policy: the cache entry is already gone even though
            // the remote document still exists.
            log::warn!("delete of {key} failed: {err}");
            return Err(err);
        }

        if self.policy == MutationPolicy::Confirmed {
            self.cache.remove(entity.id());
            self.notifier.publish(ChangeKind::Removed);
        }
        entity.model().delete_complete().await;
        entity.mark_deleted();
        Ok(())
    }

    /// Stages the entity's delete into a caller-supplied batch.
    ///
    /// Under the optimistic policy the cache entry is removed eagerly, before
    /// the caller commits; no notification fires through this path.
    pub fn stage_delete(&self, entity: &Entity<M>, batch: &mut WriteBatch) -> OrmResult<()> {
        if self.policy == MutationPolicy::Optimistic {
            self.cache.remove(entity.id());
        }
        batch.delete(self.key_for(entity.id()))?;
        Ok(())
    }

    /// Saves every entity through one shared batch, committed atomically.
    ///
    /// After a successful commit, lifecycles flip to `Persisted`, the cache
    /// is refreshed, and one `Added` fires if any staged entity was new plus
    /// one `Edited` if any was pre-existing. On commit failure only the
    /// error is surfaced.
    pub async fn save_batch(&self, entities: &mut [Entity<M>]) -> OrmResult<()> {
        let mut batch = WriteBatch::new(Arc::clone(&self.store));
        for entity in entities.iter() {
            if entity.lifecycle() == Lifecycle::Deleted {
                return Err(failed_precondition(format!(
                    "Cannot save deleted entity {}",
                    entity.id()
                )));
            }
            self.stage_save(entity, &mut batch)?;
        }

        let any_new = entities.iter().any(Entity::is_new);
        let any_existing = entities.iter().any(|entity| !entity.is_new());

        if let Err(err) = batch.commit().await {
            log::warn!("batched save into {} failed: {err}", self.collection);
            return Err(err);
        }

        for entity in entities.iter_mut() {
            entity.mark_persisted();
            self.cache.upsert(entity.clone());
        }
        if any_new {
            self.notifier.publish(ChangeKind::Added);
        }
        if any_existing {
            self.notifier.publish(ChangeKind::Edited);
        }
        Ok(())
    }

    /// Deletes every entity through one shared batch, committed atomically.
    ///
    /// Only a successful commit runs the per-entity `delete_complete` hooks
    /// (all of them, concurrently) and fires a single `Removed`. On commit
    /// failure no hook runs and only the error is surfaced — under the
    /// optimistic policy the cache entries are already gone by then.
    pub async fn delete_batch(&self, entities: &mut [Entity<M>]) -> OrmResult<()> {
        let mut batch = WriteBatch::new(Arc::clone(&self.store));
        for entity in entities.iter() {
            self.stage_delete(entity, &mut batch)?;
        }

        if let Err(err) = batch.commit().await {
            log::warn!("batched delete from {} failed: {err}", self.collection);
            return Err(err);
        }

        if entities.is_empty() {
            return Ok(());
        }

        if self.policy == MutationPolicy::Confirmed {
            for entity in entities.iter() {
                self.cache.remove(entity.id());
            }
        }
        join_all(entities.iter().map(|entity| entity.model().delete_complete())).await;
        for entity in entities.iter_mut() {
            entity.mark_deleted();
        }
        self.notifier.publish(ChangeKind::Removed);
        Ok(())
    }

    /// Snapshot of every cached entity for this model type.
    pub fn cached(&self) -> Vec<Entity<M>> {
        self.cache.all()
    }

    /// Cache lookup by identifier.
    pub fn cached_entity(&self, id: &ObjectId) -> Option<Entity<M>> {
        self.cache.get(id)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn key_for(&self, id: &ObjectId) -> DocumentKey {
        DocumentKey::new(self.collection.clone(), id.clone())
    }

    fn entity_from_record(&self, record: &Record) -> OrmResult<Entity<M>> {
        let model = M::from_record(record)?;
        Ok(Entity::persisted(record.key().id().clone(), model))
    }

    fn publish_saved(&self, was_new: bool) {
        if was_new {
            self.notifier.publish(ChangeKind::Added);
        } else {
            self.notifier.publish(ChangeKind::Edited);
        }
    }
}
