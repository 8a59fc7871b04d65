//! Error types for kntable-core.
//!
//! Every fallible operation in this crate returns [`enum@Error`]. The variants
//! follow the failure classes of the schema layer:
//!
//! - [`Error::Construction`] - malformed type, column or schema construction
//! - [`Error::Lookup`] - a column referenced by index or name does not exist
//! - [`Error::Serialization`] - wire schema export/import failures
//! - [`Error::Registry`] - extension registry misuse or unknown value types
//! - [`Error::Conversion`] - a converter could not encode or decode a value
//!
//! None of these are retried internally.

use thiserror::Error;

/// Main error type for kntable-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed type, column or schema construction
    #[error("Construction error: {0}")]
    Construction(String),

    /// Column lookup by index or name failed
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Wire schema export or import failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Extension registry error
    #[error("Registry error: {0}")]
    Registry(String),

    /// Value could not be converted between storage and logical form
    #[error("Conversion error: {0}")]
    Conversion(String),
}

impl Error {
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("invalid JSON: {err}"))
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
