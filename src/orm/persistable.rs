use async_trait::async_trait;

use crate::error::OrmResult;
use crate::model::{FieldMap, Record};
use crate::orm::ChannelSet;

/// Capability set a model type supplies to become persistable.
///
/// Implementors name their remote collection, map themselves to and from
/// document fields, and optionally customize their notification channels and
/// post-delete cleanup. Everything else — fetch, save, delete, batching,
/// caching, notifications — is provided by [`Repository`](crate::orm::Repository).
///
/// Models deriving serde traits can lean on
/// [`to_field_map`](crate::model::to_field_map) and
/// [`from_field_map`](crate::model::from_field_map) for the two mapping
/// methods.
#[async_trait]
pub trait Persistable: Clone + Send + Sync + Sized + 'static {
    /// Name of the top-level collection this model persists into.
    fn collection() -> &'static str;

    /// Serializes the model into document fields for a write.
    fn to_fields(&self) -> OrmResult<FieldMap>;

    /// Reconstructs the model from a fetched record.
    fn from_record(record: &Record) -> OrmResult<Self>;

    /// Named notification channels for this model type.
    ///
    /// Defaults to `<collection>.added` / `<collection>.removed` /
    /// `<collection>.edited`; override to rename or drop the edited channel.
    fn channels() -> ChannelSet {
        ChannelSet::for_collection(Self::collection())
    }

    /// Cleanup hook invoked once the remote store has confirmed a delete.
    /// The default does nothing.
    async fn delete_complete(&self) {}
}
