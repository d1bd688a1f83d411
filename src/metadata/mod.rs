//! Metadata data model: field keys, values, and confidence

mod field;
mod value;

pub use field::{FieldKeyError, MetadataFieldKey, ANY_QUALIFIER};
pub use value::{is_placeholder, Confidence, ItemId, MetadataValue, PLACEHOLDER_VALUE};
