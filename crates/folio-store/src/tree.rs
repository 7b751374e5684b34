//! In-memory durable tree for tests.
//!
//! Directories are explicit nodes, so a blob write into a directory that was
//! never created fails the same way it would on a real filesystem.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use folio_types::TreePath;

use crate::error::{StoreError, StoreResult};
use crate::traits::{DurableTree, EntryKind, TreeEntry};

#[derive(Clone, Debug)]
enum Node {
    Directory,
    Blob(Bytes),
}

/// A `BTreeMap`-backed implementation of [`DurableTree`].
pub struct InMemoryTree {
    nodes: RwLock<BTreeMap<TreePath, Node>>,
    available: AtomicBool,
}

impl InMemoryTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Take the tree offline (`false`) or bring it back (`true`).
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Create a directory and its ancestors without going through the async
    /// trait. Convenient for seeding fixtures.
    pub fn insert_dir(&self, path: &str) -> StoreResult<()> {
        let path = parse(path)?;
        let mut nodes = self.write_nodes()?;
        make_dirs(&mut nodes, &path)
    }

    /// Write a blob, creating missing directories above it.
    pub fn insert_blob(&self, path: &str, content: impl Into<Bytes>) -> StoreResult<()> {
        let path = parse(path)?;
        let mut nodes = self.write_nodes()?;
        if let Some(parent) = path.parent() {
            make_dirs(&mut nodes, &parent)?;
        }
        nodes.insert(path, Node::Blob(content.into()));
        Ok(())
    }

    /// The blob at `path`, if any.
    pub fn blob(&self, path: &str) -> Option<Bytes> {
        let path = path.parse::<TreePath>().ok()?;
        match self.read_nodes().ok()?.get(&path) {
            Some(Node::Blob(content)) => Some(content.clone()),
            _ => None,
        }
    }

    /// Returns `true` if a directory exists at `path`.
    pub fn is_dir(&self, path: &str) -> bool {
        let Ok(path) = path.parse::<TreePath>() else {
            return false;
        };
        if path.is_root() {
            return true;
        }
        matches!(
            self.read_nodes().ok().and_then(|n| n.get(&path).cloned()),
            Some(Node::Directory)
        )
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory tree is offline".into()))
        }
    }

    fn read_nodes(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<TreePath, Node>>> {
        self.check_available()?;
        self.nodes
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_nodes(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<TreePath, Node>>> {
        self.check_available()?;
        self.nodes
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.read_nodes().map(|n| n.len()).unwrap_or(0);
        f.debug_struct("InMemoryTree")
            .field("node_count", &count)
            .finish()
    }
}

fn parse(path: &str) -> StoreResult<TreePath> {
    path.parse()
        .map_err(|_| StoreError::InvalidPath(path.to_string()))
}

fn make_dirs(nodes: &mut BTreeMap<TreePath, Node>, path: &TreePath) -> StoreResult<()> {
    if path.is_root() {
        return Ok(());
    }
    for dir in path.ancestors().chain(std::iter::once(path.clone())) {
        match nodes.get(&dir) {
            Some(Node::Blob(_)) => return Err(StoreError::NotADirectory(dir.to_string())),
            Some(Node::Directory) => {}
            None => {
                nodes.insert(dir, Node::Directory);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl DurableTree for InMemoryTree {
    async fn list(&self, path: &TreePath) -> StoreResult<Vec<TreeEntry>> {
        let nodes = self.read_nodes()?;
        if let Some(Node::Blob(_)) = nodes.get(path) {
            return Err(StoreError::NotADirectory(path.to_string()));
        }
        // BTreeMap order keeps the listing sorted by name.
        let entries = nodes
            .iter()
            .filter(|(child, _)| child.parent().as_ref() == Some(path))
            .filter_map(|(child, node)| {
                let name = child.file_name()?.to_string();
                let kind = match node {
                    Node::Directory => EntryKind::Directory,
                    Node::Blob(_) => EntryKind::Blob,
                };
                Some(TreeEntry { name, kind })
            })
            .collect();
        Ok(entries)
    }

    async fn read(&self, path: &TreePath) -> StoreResult<Option<Bytes>> {
        match self.read_nodes()?.get(path) {
            Some(Node::Blob(content)) => Ok(Some(content.clone())),
            _ => Ok(None),
        }
    }

    async fn write(&self, path: &TreePath, content: Bytes) -> StoreResult<()> {
        let mut nodes = self.write_nodes()?;
        if path.is_root() {
            return Err(StoreError::IsADirectory(path.to_string()));
        }
        if let Some(parent) = path.parent().filter(|p| !p.is_root()) {
            match nodes.get(&parent) {
                Some(Node::Directory) => {}
                Some(Node::Blob(_)) => return Err(StoreError::NotADirectory(parent.to_string())),
                None => return Err(StoreError::ParentMissing(path.to_string())),
            }
        }
        if let Some(Node::Directory) = nodes.get(path) {
            return Err(StoreError::IsADirectory(path.to_string()));
        }
        nodes.insert(path.clone(), Node::Blob(content));
        Ok(())
    }

    async fn create_dirs(&self, path: &TreePath) -> StoreResult<()> {
        let mut nodes = self.write_nodes()?;
        make_dirs(&mut nodes, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> TreePath {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn write_requires_parent() {
        let tree = InMemoryTree::new();
        let err = tree
            .write(&path("project1/1/index.html"), Bytes::from_static(b"hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ParentMissing(_)));

        tree.create_dirs(&path("project1/1")).await.unwrap();
        tree.write(&path("project1/1/index.html"), Bytes::from_static(b"hi"))
            .await
            .unwrap();
        assert_eq!(tree.blob("project1/1/index.html").unwrap(), "hi");
    }

    #[tokio::test]
    async fn blob_at_root_level() {
        let tree = InMemoryTree::new();
        tree.write(&path("README"), Bytes::from_static(b"x")).await.unwrap();
        let entries = tree.list(&TreePath::root()).await.unwrap();
        assert_eq!(entries, vec![TreeEntry::blob("README")]);
    }

    #[tokio::test]
    async fn list_children_sorted() {
        let tree = InMemoryTree::new();
        tree.insert_blob("project2/1/index.html", "a").unwrap();
        tree.insert_blob("project1/.placeholder", "").unwrap();
        tree.insert_dir("project1/3").unwrap();

        let top = tree.list(&TreePath::root()).await.unwrap();
        assert_eq!(
            top,
            vec![TreeEntry::directory("project1"), TreeEntry::directory("project2")]
        );

        let children = tree.list(&path("project1")).await.unwrap();
        assert_eq!(
            children,
            vec![TreeEntry::blob(".placeholder"), TreeEntry::directory("3")]
        );
    }

    #[tokio::test]
    async fn missing_path_lists_empty() {
        let tree = InMemoryTree::new();
        assert!(tree.list(&path("nope")).await.unwrap().is_empty());
        assert!(tree.read(&path("nope/x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blob_is_not_a_directory() {
        let tree = InMemoryTree::new();
        tree.insert_blob("a", "x").unwrap();
        assert!(matches!(
            tree.list(&path("a")).await.unwrap_err(),
            StoreError::NotADirectory(_)
        ));
        assert!(matches!(
            tree.create_dirs(&path("a/b")).await.unwrap_err(),
            StoreError::NotADirectory(_)
        ));
    }

    #[tokio::test]
    async fn overwrite_is_last_writer_wins() {
        let tree = InMemoryTree::new();
        tree.create_dirs(&path("d")).await.unwrap();
        tree.write(&path("d/f"), Bytes::from_static(b"1")).await.unwrap();
        tree.write(&path("d/f"), Bytes::from_static(b"2")).await.unwrap();
        assert_eq!(tree.blob("d/f").unwrap(), "2");
        assert!(tree.is_dir("d"));
        assert!(!tree.is_dir("d/f"));
    }

    #[tokio::test]
    async fn offline_tree_reports_unavailable() {
        let tree = InMemoryTree::new();
        tree.set_available(false);
        assert!(matches!(
            tree.list(&TreePath::root()).await.unwrap_err(),
            StoreError::Unavailable(_)
        ));
    }
}
