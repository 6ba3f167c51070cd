use std::sync::Arc;

use crate::error::{resource_exhausted, OrmResult};
use crate::model::{DocumentKey, FieldMap};
use crate::store::{DocumentStore, WriteOperation};

/// Most stores cap a single atomic commit; Firestore allows 500 writes.
pub const MAX_BATCH_WRITES: usize = 500;

/// Aggregates write operations and commits them atomically.
#[derive(Clone)]
pub struct WriteBatch {
    store: Arc<dyn DocumentStore>,
    writes: Vec<WriteOperation>,
}

impl std::fmt::Debug for WriteBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBatch")
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

impl WriteBatch {
    pub(crate) fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            writes: Vec::new(),
        }
    }

    /// Stages a set operation.
    pub fn set(
        &mut self,
        key: DocumentKey,
        fields: FieldMap,
        merge: bool,
    ) -> OrmResult<&mut Self> {
        self.ensure_capacity()?;
        self.writes.push(WriteOperation::Set { key, fields, merge });
        Ok(self)
    }

    /// Stages a delete operation.
    pub fn delete(&mut self, key: DocumentKey) -> OrmResult<&mut Self> {
        self.ensure_capacity()?;
        self.writes.push(WriteOperation::Delete { key });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Commits all staged writes atomically through the store.
    pub async fn commit(self) -> OrmResult<()> {
        self.store.commit(self.writes).await
    }

    fn ensure_capacity(&self) -> OrmResult<()> {
        if self.writes.len() >= MAX_BATCH_WRITES {
            return Err(resource_exhausted(format!(
                "A write batch cannot contain more than {MAX_BATCH_WRITES} operations"
            )));
        }
        Ok(())
    }
}
