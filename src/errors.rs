// errors.rs
use thiserror::Error;

use crate::remote::RemoteError;

/// Errors that end a migration run. None of these are recovered from:
/// they bubble up to `main` and the process exits non-zero.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Read error: {0}")]
    Read(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Verification error: {0}")]
    Verify(String),
}

impl MigrationError {
    /// Classifies a failure that happened while opening the destination.
    pub fn from_open(err: RemoteError) -> Self {
        match err {
            RemoteError::Unauthorized(msg) => MigrationError::Authentication(msg),
            other => MigrationError::Connection(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for MigrationError {
    fn from(err: rusqlite::Error) -> Self {
        MigrationError::Read(err.to_string())
    }
}

/// A single row that could not be written. The run carries on after one of these.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct InsertError {
    pub address: Option<String>,
    #[source]
    pub source: RemoteError,
}

pub type MigrationResult<T> = Result<T, MigrationError>;
