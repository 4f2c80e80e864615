// src/errors.rs
use thiserror::Error;

/// Crate-wide unified error type.
#[derive(Error, Debug)]
pub enum FirescanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scan error: {0}")]
    ScanError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}
