//! Error types for kntable.

use thiserror::Error;

/// Main error type for kntable operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the logical type layer
    #[error(transparent)]
    Core(#[from] kntable_core::Error),

    /// Error from the Arrow bridge
    #[error(transparent)]
    Bridge(#[from] kntable_arrow::BridgeError),

    /// Error reading an Arrow IPC file
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
