//! Storage adapters for Folio.
//!
//! Folio talks to two external stores, each through a narrow capability
//! trait so the catalog logic never depends on a concrete backend:
//!
//! - [`FastStore`] -- a low-latency key-value index with atomic increment and
//!   a watch/commit optimistic transaction primitive
//! - [`DurableTree`] -- a hierarchical store of content blobs, the system of
//!   record that the catalog can always be rebuilt from
//!
//! # Backends
//!
//! - [`InMemoryFastStore`] -- `HashMap`-based fast store with per-key revisions
//! - [`RedisFastStore`] -- fast store on a Redis server, shared across processes
//! - [`InMemoryTree`] -- `BTreeMap`-based durable tree for tests
//! - [`LocalDiskTree`] -- durable tree rooted at a local directory
//!
//! # Design Rules
//!
//! 1. Every operation is a single round-trip; no method holds state across calls.
//! 2. A [`Watch`] commit succeeds only if the key has not been written since
//!    the watch was taken, including writes that restore the same bytes.
//! 3. Listing or reading a path that does not exist is not an error.
//! 4. Backend failures are returned as [`StoreError`], never swallowed.

pub mod disk;
pub mod error;
pub mod memory;
pub mod remote;
pub mod traits;
pub mod tree;

pub use disk::LocalDiskTree;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryFastStore;
pub use remote::RedisFastStore;
pub use traits::{DurableTree, EntryKind, FastStore, TreeEntry, Watch};
pub use tree::InMemoryTree;
