//! The [`FastStore`] and [`DurableTree`] capability traits.

use async_trait::async_trait;
use bytes::Bytes;
use folio_types::TreePath;

use crate::error::StoreResult;

/// A snapshot of one key taken by [`FastStore::watch`].
///
/// The snapshot remembers the key's revision. Passing it back to
/// [`FastStore::commit`] writes the new value only if no other write has
/// touched the key in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Watch {
    key: String,
    value: Option<Bytes>,
    revision: u64,
}

impl Watch {
    /// Build a snapshot. Backends call this; callers only read it.
    pub fn new(key: impl Into<String>, value: Option<Bytes>, revision: u64) -> Self {
        Self {
            key: key.into(),
            value,
            revision,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The value at watch time, `None` if the key was absent.
    pub fn value(&self) -> Option<&Bytes> {
        self.value.as_ref()
    }

    /// Backend-defined revision of the key at watch time.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Low-latency key-value store holding Folio's metadata.
///
/// Modeled on a Redis-style server: values are opaque bytes, integers are
/// stored as decimal ASCII, and all operations are atomic per key.
#[async_trait]
pub trait FastStore: Send + Sync {
    /// Read a key. Returns `Ok(None)` if it does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Unconditionally write a key.
    async fn set(&self, key: &str, value: Bytes) -> StoreResult<()>;

    /// Write a key only if it does not exist. Returns `true` if written.
    async fn set_if_absent(&self, key: &str, value: Bytes) -> StoreResult<bool>;

    /// Remove a key. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Atomically increment the integer at `key` and return the new value.
    ///
    /// An absent key counts as 0, so the first increment returns 1.
    async fn increment(&self, key: &str) -> StoreResult<u64>;

    /// Snapshot a key for a later [`commit`](FastStore::commit).
    async fn watch(&self, key: &str) -> StoreResult<Watch>;

    /// Write `value` to the watched key if it is unchanged since `watch`.
    ///
    /// Returns `Ok(false)` on conflict; the caller re-watches and retries.
    async fn commit(&self, watch: &Watch, value: Bytes) -> StoreResult<bool>;
}

/// Kind of a durable-tree entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Directory,
    Blob,
}

/// One child returned by [`DurableTree::list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl TreeEntry {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn blob(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Blob,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Hierarchical durable store of content blobs.
#[async_trait]
pub trait DurableTree: Send + Sync {
    /// List the children of `path`, sorted by name.
    ///
    /// A missing path lists as empty.
    async fn list(&self, path: &TreePath) -> StoreResult<Vec<TreeEntry>>;

    /// Read the blob at `path`. Returns `Ok(None)` if there is none.
    async fn read(&self, path: &TreePath) -> StoreResult<Option<Bytes>>;

    /// Write a blob, replacing any existing blob. The parent must exist.
    async fn write(&self, path: &TreePath, content: Bytes) -> StoreResult<()>;

    /// Create `path` and every missing directory above it.
    async fn create_dirs(&self, path: &TreePath) -> StoreResult<()>;
}
