//! Rebuild the catalog from the durable tree.
//!
//! The durable tree is the system of record. Whenever the fast store's
//! catalog is missing or unreadable, [`ReconciliationScanner::scan`] walks
//! the tree two levels deep and writes a fresh catalog back. Only "list
//! children" is needed from the tree, so any [`DurableTree`] backend works.

use std::sync::Arc;

use bytes::Bytes;
use folio_store::{DurableTree, FastStore, TreeEntry};
use folio_types::{keys, Catalog, Project, TreePath, VersionNumber};
use tracing::{debug, info, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::layout::parse_project_dir;

/// Walks the durable tree and rebuilds the catalog.
#[derive(Clone)]
pub struct ReconciliationScanner {
    tree: Arc<dyn DurableTree>,
    fast: Arc<dyn FastStore>,
}

impl ReconciliationScanner {
    pub fn new(tree: Arc<dyn DurableTree>, fast: Arc<dyn FastStore>) -> Self {
        Self { tree, fast }
    }

    /// Walk the tree and return the catalog it describes, without touching
    /// the fast store.
    ///
    /// Top-level directories named like `project12` become projects; inside
    /// each, directories with purely numeric names become versions. Anything
    /// else is ignored. The result depends only on the tree's contents.
    pub async fn build(&self) -> CatalogResult<Catalog> {
        let mut projects = Vec::new();
        for entry in self.tree.list(&TreePath::root()).await? {
            if !entry.is_dir() {
                continue;
            }
            let Some(number) = parse_project_dir(&entry.name) else {
                debug!(name = %entry.name, "skipping non-project entry");
                continue;
            };
            let dir = TreePath::root()
                .join(entry.name.as_str())
                .map_err(|e| CatalogError::Serialization(e.to_string()))?;
            let versions = version_dirs(self.tree.list(&dir).await?);
            projects.push(Project::with_versions(number, versions));
        }
        Ok(Catalog::from_projects(projects))
    }

    /// Rebuild the catalog and store it in the fast store.
    ///
    /// The catalog write must succeed. Each project's metadata record is
    /// also written as a cache warm-up; those writes are best effort.
    pub async fn scan(&self) -> CatalogResult<Catalog> {
        let catalog = self.build().await?;
        let encoded = catalog
            .to_json()
            .map_err(|e| CatalogError::Serialization(e.to_string()))?;
        self.fast.set(keys::CATALOG, Bytes::from(encoded)).await?;

        for project in &catalog {
            if let Err(e) = self.cache_metadata(project).await {
                warn!(project = %project.number, error = %e, "failed to cache project metadata");
            }
        }

        info!(projects = catalog.len(), "rebuilt catalog from durable tree");
        Ok(catalog)
    }

    async fn cache_metadata(&self, project: &Project) -> CatalogResult<()> {
        let encoded =
            serde_json::to_vec(project).map_err(|e| CatalogError::Serialization(e.to_string()))?;
        self.fast
            .set(&keys::metadata(project.number), Bytes::from(encoded))
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for ReconciliationScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationScanner").finish_non_exhaustive()
    }
}

fn version_dirs(entries: Vec<TreeEntry>) -> Vec<VersionNumber> {
    entries
        .into_iter()
        .filter(TreeEntry::is_dir)
        .filter_map(|entry| entry.name.parse::<VersionNumber>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use folio_store::{InMemoryFastStore, InMemoryTree, StoreError, StoreResult, Watch};
    use folio_types::ProjectNumber;

    fn p(n: u64) -> ProjectNumber {
        ProjectNumber::new(n).unwrap()
    }

    fn versions(catalog: &Catalog, n: u64) -> Vec<u64> {
        catalog
            .get(p(n))
            .unwrap()
            .versions
            .iter()
            .map(|v| v.get())
            .collect()
    }

    fn fixture() -> Arc<InMemoryTree> {
        let tree = InMemoryTree::new();
        tree.insert_blob("project7/1/index.html", "one").unwrap();
        tree.insert_blob("project7/3/index.html", "three").unwrap();
        tree.insert_blob("project7/2/index.html", "two").unwrap();
        tree.insert_blob("project7/.placeholder", "").unwrap();
        tree.insert_dir("project7/drafts").unwrap();
        tree.insert_blob("project7/10", "a blob, not a version").unwrap();
        tree.insert_dir("project2").unwrap();
        tree.insert_dir("project10/1").unwrap();
        tree.insert_dir("project0/1").unwrap();
        tree.insert_dir("scratch").unwrap();
        tree.insert_dir("42").unwrap();
        tree.insert_blob("project5", "file named like a project").unwrap();
        Arc::new(tree)
    }

    fn scanner(tree: Arc<InMemoryTree>) -> (Arc<InMemoryFastStore>, ReconciliationScanner) {
        let fast = Arc::new(InMemoryFastStore::new());
        let scanner = ReconciliationScanner::new(tree, fast.clone());
        (fast, scanner)
    }

    #[tokio::test]
    async fn empty_tree_gives_empty_catalog() {
        let (fast, scanner) = scanner(Arc::new(InMemoryTree::new()));
        let catalog = scanner.scan().await.unwrap();
        assert!(catalog.is_empty());
        assert_eq!(fast.get(keys::CATALOG).await.unwrap().unwrap(), "[]");
    }

    #[tokio::test]
    async fn build_recognizes_projects_and_versions() {
        let (_fast, scanner) = scanner(fixture());
        let catalog = scanner.build().await.unwrap();

        let numbers: Vec<u64> = catalog.iter().map(|p| p.number.get()).collect();
        assert_eq!(numbers, vec![10, 7, 2]);
        assert_eq!(versions(&catalog, 7), vec![1, 2, 3]);
        assert_eq!(versions(&catalog, 10), vec![1]);
        assert!(versions(&catalog, 2).is_empty());
    }

    #[tokio::test]
    async fn versions_sort_numerically() {
        let tree = InMemoryTree::new();
        for v in ["10", "9", "100", "1"] {
            tree.insert_dir(&format!("project1/{v}")).unwrap();
        }
        let (_fast, scanner) = scanner(Arc::new(tree));
        let catalog = scanner.build().await.unwrap();
        assert_eq!(versions(&catalog, 1), vec![1, 9, 10, 100]);
    }

    #[tokio::test]
    async fn aliased_directories_merge() {
        let tree = InMemoryTree::new();
        tree.insert_dir("project3/1").unwrap();
        tree.insert_dir("project03/2").unwrap();
        tree.insert_dir("proj3/02").unwrap();
        let (_fast, scanner) = scanner(Arc::new(tree));
        let catalog = scanner.build().await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(versions(&catalog, 3), vec![1, 2]);
    }

    #[tokio::test]
    async fn scan_writes_catalog_and_metadata() {
        let (fast, scanner) = scanner(fixture());
        let catalog = scanner.scan().await.unwrap();

        let stored = fast.get(keys::CATALOG).await.unwrap().unwrap();
        assert_eq!(Catalog::from_json(&stored).unwrap(), catalog);

        let meta = fast.get(&keys::metadata(p(7))).await.unwrap().unwrap();
        let project: Project = serde_json::from_slice(&meta).unwrap();
        assert_eq!(project, *catalog.get(p(7)).unwrap());
        assert_eq!(fast.keys("project:").len(), 3);
    }

    #[tokio::test]
    async fn scan_is_deterministic() {
        let (fast, scanner) = scanner(fixture());
        scanner.scan().await.unwrap();
        let first = fast.get(keys::CATALOG).await.unwrap().unwrap();
        scanner.scan().await.unwrap();
        let second = fast.get(keys::CATALOG).await.unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unavailable_tree_propagates() {
        let tree = fixture();
        tree.set_available(false);
        let (_fast, scanner) = scanner(tree);
        assert!(matches!(
            scanner.scan().await.unwrap_err(),
            CatalogError::StoreUnavailable(_)
        ));
    }

    /// Rejects writes to metadata keys and passes everything else through.
    struct NoMetadataStore(InMemoryFastStore);

    #[async_trait]
    impl FastStore for NoMetadataStore {
        async fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
            self.0.get(key).await
        }
        async fn set(&self, key: &str, value: Bytes) -> StoreResult<()> {
            if key.ends_with(":metadata") {
                return Err(StoreError::Unavailable("metadata shard down".into()));
            }
            self.0.set(key, value).await
        }
        async fn set_if_absent(&self, key: &str, value: Bytes) -> StoreResult<bool> {
            self.0.set_if_absent(key, value).await
        }
        async fn delete(&self, key: &str) -> StoreResult<bool> {
            self.0.delete(key).await
        }
        async fn increment(&self, key: &str) -> StoreResult<u64> {
            self.0.increment(key).await
        }
        async fn watch(&self, key: &str) -> StoreResult<Watch> {
            self.0.watch(key).await
        }
        async fn commit(&self, watch: &Watch, value: Bytes) -> StoreResult<bool> {
            self.0.commit(watch, value).await
        }
    }

    #[tokio::test]
    async fn metadata_failures_are_not_fatal() {
        let fast = Arc::new(NoMetadataStore(InMemoryFastStore::new()));
        let scanner = ReconciliationScanner::new(fixture(), fast.clone());
        let catalog = scanner.scan().await.unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(fast.get(keys::CATALOG).await.unwrap().is_some());
        assert!(fast.get(&keys::metadata(p(7))).await.unwrap().is_none());
    }
}
