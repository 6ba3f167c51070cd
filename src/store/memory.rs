use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::OrmResult;
use crate::model::{CollectionId, DocumentKey, FieldMap, ObjectId, Record};
use crate::store::{DocumentStore, FieldFilter, FilterOperator, Predicate, WriteOperation};

/// Document store that keeps everything in process memory.
///
/// Useful for tests and demos where no backend is available. Documents are
/// keyed by their canonical `collection/id` path.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<BTreeMap<String, FieldMap>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document directly, bypassing the write path.
    pub fn insert(&self, key: &DocumentKey, fields: FieldMap) {
        let mut store = self.documents.lock().unwrap();
        store.insert(key.canonical_string(), fields);
    }

    /// Returns the stored fields for `key`, if the document exists.
    pub fn document(&self, key: &DocumentKey) -> Option<FieldMap> {
        let store = self.documents.lock().unwrap();
        store.get(&key.canonical_string()).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.lock().unwrap().is_empty()
    }

    fn apply_set(&self, key: &DocumentKey, fields: FieldMap, merge: bool) {
        let mut store = self.documents.lock().unwrap();
        let canonical = key.canonical_string();
        if merge {
            let mut merged = store.get(&canonical).cloned().unwrap_or_default();
            for (name, value) in fields {
                merged.insert(name, value);
            }
            store.insert(canonical, merged);
        } else {
            store.insert(canonical, fields);
        }
    }

    fn apply_delete(&self, key: &DocumentKey) {
        let mut store = self.documents.lock().unwrap();
        store.remove(&key.canonical_string());
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(
        &self,
        collection: &CollectionId,
        predicate: Option<&Predicate>,
    ) -> OrmResult<Vec<Record>> {
        let store = self.documents.lock().unwrap();
        let mut records = Vec::new();

        for (path, fields) in store.iter() {
            let Some((owner, id)) = path.split_once('/') else {
                continue;
            };
            if owner != collection.as_str() {
                continue;
            }
            if let Some(predicate) = predicate {
                if !satisfies_filters(fields, predicate.filters()) {
                    continue;
                }
            }
            let key = DocumentKey::new(collection.clone(), ObjectId::from(id));
            records.push(Record::new(key, fields.clone()));
        }

        Ok(records)
    }

    async fn set(&self, key: &DocumentKey, fields: FieldMap, merge: bool) -> OrmResult<()> {
        self.apply_set(key, fields, merge);
        Ok(())
    }

    async fn delete(&self, key: &DocumentKey) -> OrmResult<()> {
        self.apply_delete(key);
        Ok(())
    }

    async fn commit(&self, writes: Vec<WriteOperation>) -> OrmResult<()> {
        for write in writes {
            match write {
                WriteOperation::Set { key, fields, merge } => self.apply_set(&key, fields, merge),
                WriteOperation::Delete { key } => self.apply_delete(&key),
            }
        }
        Ok(())
    }
}

fn satisfies_filters(fields: &FieldMap, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|filter| {
        match fields.get(filter.field()) {
            Some(value) => evaluate_filter(filter, value),
            // Missing fields only satisfy a not-equal comparison.
            None => filter.operator() == FilterOperator::NotEqual,
        }
    })
}

fn evaluate_filter(filter: &FieldFilter, value: &Value) -> bool {
    match filter.operator() {
        FilterOperator::Equal => value == filter.value(),
        FilterOperator::NotEqual => value != filter.value(),
        FilterOperator::LessThan => compare_values(value, filter.value()) == Some(Ordering::Less),
        FilterOperator::LessThanOrEqual => matches!(
            compare_values(value, filter.value()),
            Some(Ordering::Less) | Some(Ordering::Equal)
        ),
        FilterOperator::GreaterThan => {
            compare_values(value, filter.value()) == Some(Ordering::Greater)
        }
        FilterOperator::GreaterThanOrEqual => matches!(
            compare_values(value, filter.value()),
            Some(Ordering::Greater) | Some(Ordering::Equal)
        ),
    }
}

fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
