//! Durable tree rooted at a local directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use folio_types::TreePath;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::{DurableTree, EntryKind, TreeEntry};

/// A [`DurableTree`] backed by the local filesystem.
///
/// Tree paths map one-to-one onto paths under `root`. The root itself does
/// not need to exist until the first write; until then it lists as empty.
#[derive(Clone, Debug)]
pub struct LocalDiskTree {
    root: PathBuf,
}

impl LocalDiskTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn fs_path(&self, path: &TreePath) -> PathBuf {
        let mut full = self.root.clone();
        full.extend(path.segments());
        full
    }
}

#[async_trait]
impl DurableTree for LocalDiskTree {
    async fn list(&self, path: &TreePath) -> StoreResult<Vec<TreeEntry>> {
        let dir = self.fs_path(path);
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                debug!(dir = %dir.display(), "skipping non-UTF-8 entry");
                continue;
            };
            let kind = if entry.file_type().await?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::Blob
            };
            entries.push(TreeEntry { name, kind });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, path: &TreePath) -> StoreResult<Option<Bytes>> {
        let file = self.fs_path(path);
        if tokio::fs::metadata(&file).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Ok(None);
        }
        match tokio::fs::read(&file).await {
            Ok(content) => Ok(Some(Bytes::from(content))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &TreePath, content: Bytes) -> StoreResult<()> {
        if path.is_root() {
            return Err(StoreError::IsADirectory(path.to_string()));
        }
        let file = self.fs_path(path);
        match tokio::fs::write(&file, &content).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::ParentMissing(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_dirs(&self, path: &TreePath) -> StoreResult<()> {
        tokio::fs::create_dir_all(self.fs_path(path)).await?;
        Ok(())
    }
}
