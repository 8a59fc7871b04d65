//! kntable-arrow: Arrow columnar bridge for KNIME logical types.
//!
//! This crate connects the logical schemas of `kntable-core` to Arrow:
//! - Storage type mapping and logical tags in Arrow field metadata
//! - Lazily decoded logical column views and encoding builders
//! - Struct dictionary encoding
//! - Geometry columns over WKB storage
//! - Integer missing-value sentinels
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use kntable_arrow::LogicalColumnBuilder;
//! use kntable_core::ExtensionRegistry;
//!
//! let registry = ExtensionRegistry::with_builtins().unwrap();
//! let ktype = registry.logical_for::<NaiveDate>().unwrap();
//!
//! let mut builder = LogicalColumnBuilder::<NaiveDate>::try_new(&ktype, 1024).unwrap();
//! builder.append(NaiveDate::from_ymd_opt(2024, 5, 1).as_ref()).unwrap();
//! builder.append(None).unwrap();
//! let column = builder.finish_column().unwrap();
//!
//! assert_eq!(column.get(0).unwrap(), NaiveDate::from_ymd_opt(2024, 5, 1));
//! assert_eq!(column.get(1).unwrap(), None);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        kntable-arrow                                |
//! +---------------------------------------------------------------------+
//! |  arrow_schema  - KnimeType <-> DataType, field and schema metadata  |
//! |  storage       - StorageValue <-> Arrow arrays                      |
//! |  dict          - struct dictionary encoding                         |
//! |  view          - LogicalColumn, LogicalColumnBuilder                |
//! |  table         - KnimeTable, BridgeOptions                          |
//! |  geo/          - GeoValue, GeoColumn, WKB codec                     |
//! |  sentinel      - integer missing-value sentinels                    |
//! |  source        - DataSource contract                                |
//! +---------------------------------------------------------------------+
//!                              |
//!                              v
//! +---------------------------------------------------------------------+
//! |                        kntable-core                                 |
//! +---------------------------------------------------------------------+
//! |  Type algebra, extension registry, schemas, wire codec              |
//! +---------------------------------------------------------------------+
//! ```

pub mod arrow_schema;
pub mod dict;
pub mod error;
pub mod geo;
pub mod sentinel;
pub mod source;
pub mod storage;
pub mod table;
pub mod view;

// Re-export core for convenience
pub use kntable_core;

pub use arrow_schema::{
    from_arrow_field, from_arrow_schema, to_arrow_field, to_arrow_schema, to_arrow_type,
};
pub use error::{BridgeError, Result};
pub use geo::{GeoColumn, GeoFactory, GeoValue};
pub use sentinel::Sentinel;
pub use source::{schema_footer_required, DataSource};
pub use storage::{build_storage_array, storage_value_at};
pub use table::{BridgeOptions, KnimeTable};
pub use view::{LogicalColumn, LogicalColumnBuilder};
