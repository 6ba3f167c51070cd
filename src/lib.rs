//! Lightweight object mapping, caching and change notification for
//! Firestore-style document stores.
//!
//! Model types implement [`Persistable`] — a collection name plus field
//! mapping — and get fetch, save, delete and batch operations, an in-memory
//! object cache and per-type change events from a [`Repository`], all
//! delegating the actual persistence to a pluggable [`DocumentStore`]
//! backend.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use firestore_orm::{
//!     from_field_map, to_field_map, FieldMap, MemoryStore, Orm, OrmResult, Persistable, Record,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct City {
//!     name: String,
//! }
//!
//! impl Persistable for City {
//!     fn collection() -> &'static str {
//!         "cities"
//!     }
//!
//!     fn to_fields(&self) -> OrmResult<FieldMap> {
//!         to_field_map(self)
//!     }
//!
//!     fn from_record(record: &Record) -> OrmResult<Self> {
//!         from_field_map(record.fields())
//!     }
//! }
//!
//! # async fn run() -> OrmResult<()> {
//! let orm = Orm::new(Arc::new(MemoryStore::new()));
//! let cities = orm.repository::<City>()?;
//!
//! let mut sf = cities.create(City { name: "SF".into() });
//! cities.save(&mut sf).await?;
//!
//! let fetched = cities.fetch(None).await?;
//! assert_eq!(fetched.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod model;
pub mod orm;
pub mod store;

pub use error::{OrmError, OrmErrorCode, OrmResult};
pub use model::{
    from_field_map, to_field_map, CollectionId, DocumentKey, FieldMap, ObjectId, Record,
};
pub use orm::{
    global_orm, install_orm, CacheUpdate, ChangeEvent, ChangeKind, ChannelSet, Entity, Lifecycle,
    MutationPolicy, Notifier, ObjectCache, Orm, Persistable, Repository,
};
pub use store::{
    DocumentStore, FieldFilter, FilterOperator, MemoryStore, Predicate, WriteBatch, WriteOperation,
};
