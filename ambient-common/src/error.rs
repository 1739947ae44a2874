//! Common error types for the ambient engine

use thiserror::Error;

/// Common result type for ambient operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the engine and its hosts
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input value (unknown context name, bad catalog entry)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
