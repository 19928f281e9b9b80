//! Common error types for vardr.

use std::path::PathBuf;
use thiserror::Error;

/// Common error type for vardr operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No system CA bundle found (searched: {searched})")]
    SystemBundleNotFound { searched: String },

    #[error("CA bundle error: {0}")]
    Bundle(String),

    #[error("Failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("Lock error on {path}: {reason}")]
    Lock { path: PathBuf, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias using common Error.
pub type Result<T> = std::result::Result<T, Error>;

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}
