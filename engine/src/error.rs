//! Error types for the coedit engine.

use crate::VersionId;
use thiserror::Error;

/// All possible errors from the coedit engine.
///
/// Only caller mistakes surface here. A reference to an operation that has
/// not arrived yet is an expected race and is reported through return values
/// instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Submission errors
    #[error("version already finalized: {0}")]
    DuplicateVersion(VersionId),

    #[error("pending id already in use: {0}")]
    DuplicatePending(VersionId),

    // Wire format errors
    #[error("unknown operation type: {0}")]
    UnknownOperation(String),

    #[error("invalid portable operation: {0}")]
    InvalidPortable(String),

    // State errors
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidPortable(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
