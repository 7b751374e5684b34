/// Errors from fast-store and durable-tree operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend cannot be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An increment targeted a value that is not a decimal integer.
    #[error("value at {key} is not an integer")]
    NotAnInteger { key: String },

    /// An increment would push the counter past the largest representable value.
    #[error("counter at {key} would overflow")]
    Overflow { key: String },

    /// A path that must be a directory holds a blob.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A blob write targeted a path that is a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// A blob write targeted a path whose parent does not exist.
    #[error("parent directory missing for {0}")]
    ParentMissing(String),

    /// A path string could not be parsed as a tree path.
    #[error("invalid tree path: {0}")]
    InvalidPath(String),

    /// I/O error from a filesystem-backed store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// `true` for failures of the backend itself rather than of the data it holds.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Io(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
