//! Convenient re-exports for common usage.
//!
//! ```rust
//! use kntable_core::prelude::*;
//!
//! let schema = Schema::from_types([int32(), list(string())], ["id", "tags"]).unwrap();
//! assert_eq!(schema.num_columns(), 2);
//! ```

// Type algebra
pub use crate::types::{
    blob, bool_, double, int32, int64, list, string, struct_, KnimeType, LogicalType,
    PrimitiveId, PrimitiveType,
};

// Values and converters
pub use crate::registry::{
    global, install_global, logical, register_builtin_factories, Converter, DictKeyType,
    ExtensionRegistry, ValueFactory, ValueType,
};
pub use crate::value::StorageValue;

// Schema
pub use crate::schema::{Column, ColumnRef, Schema};

// Wire codec
pub use crate::wire::{from_knime_dict, schema_from_json, schema_to_json, to_knime_dict, WireSchema};

// Error types
pub use crate::error::{Error, Result};
