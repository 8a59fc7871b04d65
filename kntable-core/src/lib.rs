//! # kntable-core
//!
//! Engine-agnostic logical type layer for KNIME tables.
//!
//! This crate provides the type algebra, the extension registry of logical
//! types and their converters, table schemas, and the wire codec used to
//! exchange schemas with the host process. It has no dependency on a
//! columnar engine; see `kntable-arrow` for the Arrow bridge.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use kntable_core::prelude::*;
//!
//! let registry = ExtensionRegistry::with_builtins().unwrap();
//! let schema = Schema::from_types(
//!     [string(), registry.logical_for::<NaiveDate>().unwrap()],
//!     ["<RowID>", "day"],
//! )
//! .unwrap();
//!
//! let json = schema_to_json(&schema, &registry).unwrap();
//! let back = schema_from_json(&json, &registry).unwrap();
//! assert_eq!(back, schema);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                        kntable-core                                 |
//! +---------------------------------------------------------------------+
//! |  types/     - KnimeType algebra, interned primitives, logical types |
//! |  value/     - StorageValue, the converters' storage representation  |
//! |  registry/  - ExtensionRegistry, ValueFactory, built-in factories   |
//! |  schema/    - Column, Schema                                        |
//! |  wire/      - wire schema (specs/traits) export and import          |
//! |  error/     - Error types                                           |
//! +---------------------------------------------------------------------+
//! ```

pub mod error;
pub mod prelude;
pub mod registry;
pub mod schema;
pub mod types;
pub mod value;
pub mod wire;

pub use error::{Error, Result};
pub use registry::{ExtensionRegistry, ValueFactory};
pub use schema::{Column, Schema};
pub use types::KnimeType;
pub use value::StorageValue;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
