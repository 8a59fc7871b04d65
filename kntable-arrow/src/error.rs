//! Error types for kntable-arrow.
//!
//! Core errors (construction, registry, conversion inside converters) are
//! wrapped unchanged; this crate adds failures at the Arrow boundary.

use arrow::error::ArrowError;
use thiserror::Error;

pub use kntable_core::Error as CoreError;

/// Main error type for kntable-arrow operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Error from kntable-core
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error raised by Arrow while building or validating arrays
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Storage values and arrays do not fit together
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Arrow schema cannot be mapped to a logical schema or back
    #[error("Schema error: {0}")]
    Schema(String),
}

impl BridgeError {
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_are_transparent() {
        let err: BridgeError = CoreError::lookup("no column 'x'").into();
        assert_eq!(err.to_string(), "Lookup error: no column 'x'");
    }

    #[test]
    fn test_arrow_errors_wrap() {
        let err: BridgeError = ArrowError::SchemaError("bad".into()).into();
        assert!(matches!(err, BridgeError::Arrow(_)));
    }
}
