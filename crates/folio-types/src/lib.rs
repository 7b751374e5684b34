//! Foundation types for Folio.
//!
//! Folio keeps numbered projects, each with an append-only sequence of
//! versions. This crate holds the types every other Folio crate agrees on.
//!
//! # Key Types
//!
//! - [`ProjectNumber`] / [`VersionNumber`] -- positive integer identifiers
//! - [`Project`] -- a project and its ascending version list
//! - [`Catalog`] -- all projects, ordered descending by number
//! - [`VersionRecord`] -- one appended version with its content and author
//! - [`TreePath`] -- a slash-separated path inside the durable tree
//! - [`keys`] -- the fast-store key space

pub mod catalog;
pub mod error;
pub mod ids;
pub mod keys;
pub mod path;
pub mod record;

pub use catalog::{Catalog, Project};
pub use error::TypeError;
pub use ids::{ProjectNumber, VersionNumber};
pub use path::TreePath;
pub use record::VersionRecord;
