mod batch;
mod memory;
mod predicate;

use async_trait::async_trait;

use crate::error::OrmResult;
use crate::model::{CollectionId, DocumentKey, FieldMap, Record};

pub use batch::{WriteBatch, MAX_BATCH_WRITES};
pub use memory::MemoryStore;
pub use predicate::{FieldFilter, FilterOperator, Predicate};

/// A single staged write, applied atomically with its batch.
#[derive(Clone, Debug)]
pub enum WriteOperation {
    Set {
        key: DocumentKey,
        fields: FieldMap,
        merge: bool,
    },
    Delete {
        key: DocumentKey,
    },
}

/// The external document store consumed by the ORM layer.
///
/// Querying, persistence, offline behavior and conflict resolution all live
/// behind this trait; the ORM only forwards calls and maintains its cache.
/// Implementations report failures as `orm/remote` errors, surfaced to
/// callers unchanged.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Runs a query against `collection`, optionally narrowed by `predicate`.
    async fn query(
        &self,
        collection: &CollectionId,
        predicate: Option<&Predicate>,
    ) -> OrmResult<Vec<Record>>;

    /// Writes `fields` into the document at `key`. With `merge` set, fields
    /// absent from the write are left untouched on the remote document.
    async fn set(&self, key: &DocumentKey, fields: FieldMap, merge: bool) -> OrmResult<()>;

    /// Deletes the document at `key`. Succeeds even if the document does not
    /// exist.
    async fn delete(&self, key: &DocumentKey) -> OrmResult<()>;

    /// Applies all staged writes atomically.
    async fn commit(&self, writes: Vec<WriteOperation>) -> OrmResult<()>;
}
