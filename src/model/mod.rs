mod document_key;
mod object_id;
mod record;

pub use document_key::{CollectionId, DocumentKey};
pub use object_id::ObjectId;
pub use record::{from_field_map, to_field_map, FieldMap, Record};
