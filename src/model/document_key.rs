use std::fmt::{Display, Formatter};

use crate::error::{configuration_error, OrmResult};
use crate::model::ObjectId;

/// Validated name of a top-level collection in the backing store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(String);

impl CollectionId {
    /// Validates and wraps a collection name.
    ///
    /// Fails fast with a configuration error before any store call is made.
    pub fn new(name: impl Into<String>) -> OrmResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(configuration_error("Collection name must not be empty"));
        }
        if name.contains('/') {
            return Err(configuration_error(
                "Collection name must not contain '/' (flat collections only)",
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CollectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Addresses a single document: one collection plus the object identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    collection: CollectionId,
    id: ObjectId,
}

impl DocumentKey {
    pub fn new(collection: CollectionId, id: ObjectId) -> Self {
        Self { collection, id }
    }

    pub fn collection(&self) -> &CollectionId {
        &self.collection
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// The `collection/id` form used by stores that key documents by path.
    pub fn canonical_string(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

impl Display for DocumentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
