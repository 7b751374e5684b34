use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid project number: {0:?}")]
    InvalidProjectNumber(String),

    #[error("invalid version number: {0:?}")]
    InvalidVersionNumber(String),

    #[error("invalid tree path: {0:?}")]
    InvalidPath(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
