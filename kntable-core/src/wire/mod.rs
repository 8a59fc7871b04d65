//! Wire schema codec.
//!
//! Converts a [`Schema`] to and from the cross-process JSON form: parallel
//! `specs` (physical shapes) and `traits` (logical annotations) trees plus
//! column names and metadata.
//!
//! Two identifiers are reserved. Column 0 is always tagged with the row-key
//! identifier, and a list whose element type is logical is tagged with the
//! list identifier. Both are stripped again on import.
//!
//! ```rust
//! use kntable_core::registry::ExtensionRegistry;
//! use kntable_core::schema::Schema;
//! use kntable_core::types::{int32, string};
//! use kntable_core::wire::{from_knime_dict, to_knime_dict};
//!
//! let registry = ExtensionRegistry::new();
//! let schema = Schema::from_types([int32(), string()], ["A", "B"]).unwrap();
//! let wire = to_knime_dict(&schema, &registry).unwrap();
//! assert_eq!(from_knime_dict(&wire, &registry).unwrap(), schema);
//! ```

mod decode;
mod encode;
mod spec;

use serde_json::Value;

pub use decode::{from_knime_dict, is_host_wrapper};
pub(crate) use decode::decode_storage;
pub use encode::to_knime_dict;
pub use spec::{DataSpec, DataTraits, NestedSpec, TraitMap, WireSchema, WireTypes};

use crate::error::Result;
use crate::registry::ExtensionRegistry;
use crate::schema::Schema;

/// Identifier tagging the row-key column.
pub const ROW_KEY_LOGICAL_TYPE: &str =
    r#"{"value_factory_class":"org.knime.core.data.v2.value.DefaultRowKeyValueFactory"}"#;

/// Identifier tagging lists of logical elements.
pub const LIST_LOGICAL_TYPE: &str =
    r#"{"value_factory_class":"org.knime.core.data.v2.value.ListValueFactory"}"#;

/// Schema as an untyped JSON value.
pub fn to_knime_value(schema: &Schema, registry: &ExtensionRegistry) -> Result<Value> {
    Ok(serde_json::to_value(to_knime_dict(schema, registry)?)?)
}

/// Schema from an untyped JSON value.
pub fn from_knime_value(value: &Value, registry: &ExtensionRegistry) -> Result<Schema> {
    let wire: WireSchema = serde_json::from_value(value.clone())?;
    from_knime_dict(&wire, registry)
}

/// Schema as JSON text.
pub fn schema_to_json(schema: &Schema, registry: &ExtensionRegistry) -> Result<String> {
    Ok(serde_json::to_string(&to_knime_dict(schema, registry)?)?)
}

/// Schema from JSON text.
pub fn schema_from_json(text: &str, registry: &ExtensionRegistry) -> Result<Schema> {
    let wire: WireSchema = serde_json::from_str(text)?;
    from_knime_dict(&wire, registry)
}
