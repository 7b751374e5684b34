use folio_store::StoreError;
use folio_types::ProjectNumber;
use thiserror::Error;

/// Errors produced by the catalog engine.
///
/// `CacheCorrupt` and `DurableWriteFailed` are handled inside the engine
/// (repaired and logged respectively) and are not expected from the public
/// [`ProjectCatalog`](crate::ProjectCatalog) operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("project {0} not found")]
    ProjectNotFound(ProjectNumber),

    #[error("no projects found; create a project first")]
    NoProjectsFound,

    #[error("invalid project number: {0:?}")]
    InvalidProjectNumber(String),

    #[error("cached value at {key} is corrupt: {reason}")]
    CacheCorrupt { key: String, reason: String },

    #[error("durable write to {path} failed: {reason}")]
    DurableWriteFailed { path: String, reason: String },

    /// An optimistic update lost every commit race up to the retry cap.
    #[error("gave up updating {key} after {attempts} conflicting attempts")]
    ConcurrencyConflict { key: String, attempts: u32 },

    /// The backend could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(StoreError),

    /// The backend answered but refused the operation.
    #[error("store error: {0}")]
    Store(StoreError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<StoreError> for CatalogError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotAnInteger { key } => Self::CacheCorrupt {
                key,
                reason: "not a decimal integer".into(),
            },
            e if e.is_unavailable() => Self::StoreUnavailable(e),
            e => Self::Store(e),
        }
    }
}

/// Convenience type alias for catalog operations.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
