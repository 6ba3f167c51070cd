use std::hash::{Hash, Hasher};

use crate::model::ObjectId;
use crate::orm::Persistable;

/// Persistence state of an entity.
///
/// `New` until the first successful round-trip, `Persisted` afterwards,
/// `Deleted` once removal from the remote store has been requested. There is
/// no transition out of `Deleted`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    New,
    Persisted,
    Deleted,
}

/// A model instance bound to an identifier and a lifecycle state.
///
/// Two entities compare equal iff their identifiers match, regardless of
/// field values; the hash is derived solely from the identifier.
#[derive(Clone, Debug)]
pub struct Entity<M: Persistable> {
    id: ObjectId,
    lifecycle: Lifecycle,
    model: M,
}

impl<M: Persistable> Entity<M> {
    /// Wraps a freshly constructed model under a locally generated id.
    pub(crate) fn new_local(model: M) -> Self {
        Self {
            id: ObjectId::generate(),
            lifecycle: Lifecycle::New,
            model,
        }
    }

    /// Wraps a model reconstructed from a fetched record.
    pub(crate) fn persisted(id: ObjectId, model: M) -> Self {
        Self {
            id,
            lifecycle: Lifecycle::Persisted,
            model,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// True until the entity's first successful save round-trip.
    pub fn is_new(&self) -> bool {
        self.lifecycle == Lifecycle::New
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub(crate) fn mark_persisted(&mut self) {
        if self.lifecycle != Lifecycle::Deleted {
            self.lifecycle = Lifecycle::Persisted;
        }
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.lifecycle = Lifecycle::Deleted;
    }
}

impl<M: Persistable> PartialEq for Entity<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<M: Persistable> Eq for Entity<M> {}

impl<M: Persistable> Hash for Entity<M> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
