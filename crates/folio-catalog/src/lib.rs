//! Catalog consistency engine for Folio.
//!
//! Many writers append versions to numbered projects concurrently. This
//! crate keeps the fast-store catalog coherent while they do:
//!
//! - [`VersionCounter`] hands out per-project version numbers with an atomic
//!   increment, so two writers never receive the same number.
//! - [`ProjectCatalog`] creates projects and appends versions. Every change to
//!   the shared catalog record is an optimistic watch/commit cycle, retried
//!   with backoff under a [`RetryPolicy`] cap.
//! - [`ReconciliationScanner`] rebuilds the catalog from the durable tree
//!   whenever the cached copy is missing or corrupt.
//! - [`WriteBackWriter`] persists content to the durable tree in the
//!   background; callers never wait on it.
//!
//! Cache problems are repaired here and never reach the caller. Unknown
//! projects surface as domain errors, and store outages surface as
//! [`CatalogError::StoreUnavailable`].

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod counter;
pub mod error;
pub mod layout;
pub mod retry;
pub mod scanner;
pub mod writeback;

pub use bootstrap::BootstrapReport;
pub use catalog::ProjectCatalog;
pub use config::CatalogConfig;
pub use counter::VersionCounter;
pub use error::{CatalogError, CatalogResult};
pub use layout::{parse_project_dir, TreeLayout};
pub use retry::RetryPolicy;
pub use scanner::ReconciliationScanner;
pub use writeback::{WriteBackConfig, WriteBackStats, WriteBackWriter};
