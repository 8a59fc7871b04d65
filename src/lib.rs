//! kntable - inspect KNIME logical-type table schemas and Arrow files.
//!
//! This library backs the `kntable` binary: it loads wire schemas and Arrow
//! IPC files against an extension registry and formats what it finds.
//!
//! # Example
//!
//! ```no_run
//! use kntable::inspect::{default_registry, read_schema_file};
//!
//! fn main() -> anyhow::Result<()> {
//!     let registry = default_registry()?;
//!     let schema = read_schema_file("table.json", &registry)?;
//!     println!("{schema}");
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod inspect;

pub use error::{Error, Result};
