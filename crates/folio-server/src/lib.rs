//! HTTP server for Folio.
//!
//! Exposes the project catalog over JSON: list projects, create a project,
//! submit a new version, and fetch persisted content straight from the
//! durable tree.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{CurrentVersion, FastRequest};
pub use server::FolioServer;
