mod cache;
mod entity;
mod events;
mod persistable;
mod repository;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::error::{configuration_error, failed_precondition, OrmResult};
use crate::store::{DocumentStore, WriteBatch};

pub use cache::{CacheUpdate, ObjectCache};
pub use entity::{Entity, Lifecycle};
pub use events::{ChangeEvent, ChangeKind, ChannelSet, Notifier};
pub use persistable::Persistable;
pub use repository::Repository;

/// When cache mutations and notifications happen relative to the remote
/// round-trip.
///
/// `Optimistic` matches the historical behavior of this layer: the caller
/// sees the effect immediately and the cache converges with the remote
/// eventually. `Confirmed` waits for the store to acknowledge first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MutationPolicy {
    #[default]
    Optimistic,
    Confirmed,
}

/// Configured handle to the backing store and the per-model repositories.
///
/// Built once at process start from a [`DocumentStore`] implementation and
/// passed (or installed globally) to everything that persists. Repositories
/// are created lazily, one per model type, and shared.
#[derive(Clone)]
pub struct Orm {
    inner: Arc<OrmInner>,
}

struct OrmInner {
    store: Arc<dyn DocumentStore>,
    policy: MutationPolicy,
    repositories: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Orm {
    /// Creates a handle with the default optimistic mutation policy.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_policy(store, MutationPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn DocumentStore>, policy: MutationPolicy) -> Self {
        Self {
            inner: Arc::new(OrmInner {
                store,
                policy,
                repositories: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn policy(&self) -> MutationPolicy {
        self.inner.policy
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.inner.store)
    }

    /// Creates a write batch targeting this handle's store.
    pub fn batch(&self) -> WriteBatch {
        WriteBatch::new(self.store())
    }

    /// Resolves (or lazily creates) the repository for model type `M`.
    ///
    /// Repeated calls for the same model type yield the same shared handle,
    /// so its cache and subscriptions are process-wide when the `Orm` itself
    /// is. Fails with a configuration error if `M` names an invalid
    /// collection.
    pub fn repository<M: Persistable>(&self) -> OrmResult<Arc<Repository<M>>> {
        let mut repositories = self.inner.repositories.lock().unwrap();
        if let Some(existing) = repositories.get(&TypeId::of::<M>()) {
            let repository = Arc::clone(existing)
                .downcast::<Repository<M>>()
                .expect("repository registry is keyed by model type");
            return Ok(repository);
        }

        let repository = Arc::new(Repository::<M>::new(self.store(), self.inner.policy)?);
        repositories.insert(
            TypeId::of::<M>(),
            Arc::clone(&repository) as Arc<dyn Any + Send + Sync>,
        );
        Ok(repository)
    }
}

static GLOBAL_ORM: OnceCell<Orm> = OnceCell::new();

/// Installs the process-wide handle. Allowed exactly once; there is no
/// reconfiguration path.
pub fn install_orm(orm: Orm) -> OrmResult<()> {
    GLOBAL_ORM
        .set(orm)
        .map_err(|_| failed_precondition("The global Orm handle is already installed"))
}

/// Returns the process-wide handle installed by [`install_orm`].
pub fn global_orm() -> OrmResult<Orm> {
    GLOBAL_ORM
        .get()
        .cloned()
        .ok_or_else(|| configuration_error("No global Orm handle has been installed"))
}
