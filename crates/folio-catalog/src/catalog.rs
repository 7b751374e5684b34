//! The catalog service: project creation, version appends, and catalog reads.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use folio_store::{DurableTree, FastStore};
use folio_types::{keys, Catalog, Project, ProjectNumber, VersionNumber, VersionRecord};
use tracing::{debug, info, warn};

use crate::bootstrap::{self, BootstrapReport};
use crate::config::CatalogConfig;
use crate::counter::VersionCounter;
use crate::error::{CatalogError, CatalogResult};
use crate::layout::TreeLayout;
use crate::scanner::ReconciliationScanner;
use crate::writeback::{WriteBackStats, WriteBackWriter};

/// Creates projects, appends versions, and serves the catalog.
///
/// The catalog record and the highest-project scalar live in the fast store
/// and are only ever changed through watch/commit cycles. When the catalog
/// record is missing or unreadable it is rebuilt from the durable tree before
/// the operation continues, so callers never see a cache failure.
///
/// Content is persisted to the durable tree by a background
/// [`WriteBackWriter`]; operations return before that write happens.
#[derive(Clone)]
pub struct ProjectCatalog {
    fast: Arc<dyn FastStore>,
    tree: Arc<dyn DurableTree>,
    counter: VersionCounter,
    scanner: ReconciliationScanner,
    writer: WriteBackWriter,
    config: CatalogConfig,
}

impl ProjectCatalog {
    /// Build a catalog over the given stores and start its write-back pool.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        fast: Arc<dyn FastStore>,
        tree: Arc<dyn DurableTree>,
        config: CatalogConfig,
    ) -> CatalogResult<Self> {
        config.layout.validate()?;
        let writer = WriteBackWriter::spawn(Arc::clone(&tree), &config.write_back)?;
        Ok(Self {
            counter: VersionCounter::new(Arc::clone(&fast)),
            scanner: ReconciliationScanner::new(Arc::clone(&tree), Arc::clone(&fast)),
            fast,
            tree,
            writer,
            config,
        })
    }

    /// The current catalog: projects descending, versions ascending.
    pub async fn get_catalog(&self) -> CatalogResult<Catalog> {
        match self.fast.get(keys::CATALOG).await? {
            Some(raw) => match decode_catalog(&raw) {
                Ok(catalog) => Ok(catalog),
                Err(e) => {
                    warn!(error = %e, "catalog cache unreadable, rebuilding");
                    self.repair_catalog().await
                }
            },
            None => {
                info!("catalog cache empty, rebuilding");
                self.repair_catalog().await
            }
        }
    }

    /// Create project `number`, or return it unchanged if it already exists.
    pub async fn create_project(&self, number: ProjectNumber) -> CatalogResult<Project> {
        if let Some(existing) = self.get_catalog().await?.get(number) {
            debug!(project = %number, "project already exists");
            return Ok(existing.clone());
        }

        self.counter.initialize(number).await?;
        self.raise_highest(number).await?;
        let project = self
            .update_catalog(|catalog| Ok(catalog.insert_project(number).clone()))
            .await?;

        self.writer
            .enqueue(self.config.layout.placeholder_path(number)?, Bytes::new());
        info!(project = %number, "created project");
        Ok(project)
    }

    /// Append a new version of `project`.
    ///
    /// The version number is allocated first and the content recorded in the
    /// fast store before the catalog is updated, so for a short window the
    /// version exists but is not yet listed.
    pub async fn append_version(
        &self,
        project: ProjectNumber,
        content: impl Into<Bytes>,
        author: &str,
    ) -> CatalogResult<VersionRecord> {
        let content = content.into();
        let version = self.allocate_version(project).await?;
        let created_at = Utc::now();

        self.fast
            .set(&keys::content(project, version), content.clone())
            .await?;
        self.fast
            .set(&keys::author(project, version), Bytes::from(author.to_owned()))
            .await?;
        self.fast
            .set(
                &keys::created_at(project, version),
                Bytes::from(created_at.timestamp().to_string()),
            )
            .await?;

        let record = |catalog: &mut Catalog| {
            catalog
                .record_version(project, version)
                .map(|_| ())
                .ok_or(CatalogError::ProjectNotFound(project))
        };
        match self.update_catalog(record).await {
            Err(CatalogError::ProjectNotFound(_)) => {
                // The project may exist only in the durable tree. Fold the
                // tree's view in without dropping anything already listed.
                debug!(project = %project, "project missing from catalog, merging durable tree");
                let scanned = self.scanner.build().await?;
                self.update_catalog(|catalog| {
                    catalog.merge(&scanned);
                    record(catalog)
                })
                .await?;
            }
            other => other?,
        }

        self.writer.enqueue(
            self.config.layout.content_path(project, version)?,
            content.clone(),
        );
        info!(project = %project, version = %version, author, bytes = content.len(), "appended version");

        Ok(VersionRecord {
            project,
            version,
            content,
            author: author.to_owned(),
            created_at,
        })
    }

    /// Append a version to the highest-numbered project.
    pub async fn append_to_latest(
        &self,
        content: impl Into<Bytes>,
        author: &str,
    ) -> CatalogResult<VersionRecord> {
        let project = match self.highest_project_number().await? {
            Some(project) => project,
            None => self
                .get_catalog()
                .await?
                .highest_project()
                .ok_or(CatalogError::NoProjectsFound)?,
        };
        self.append_version(project, content, author).await
    }

    /// The cached highest project number, `None` if unset or unreadable.
    pub async fn highest_project_number(&self) -> CatalogResult<Option<ProjectNumber>> {
        let raw = self.fast.get(keys::HIGHEST_PROJECT_NUMBER).await?;
        Ok(raw
            .as_deref()
            .and_then(parse_integer)
            .and_then(|n| ProjectNumber::new(n).ok()))
    }

    /// Rebuild the catalog from the durable tree now.
    ///
    /// Pending write-backs are drained first so every version this process
    /// accepted is on the tree before it is scanned.
    pub async fn reconcile(&self) -> CatalogResult<Catalog> {
        self.writer.drain().await;
        self.scanner.scan().await
    }

    /// Reseed every fast-store scalar from the durable tree. Run at startup.
    pub async fn bootstrap(&self) -> CatalogResult<BootstrapReport> {
        bootstrap::bootstrap(self.fast.as_ref(), &self.scanner, &self.counter).await
    }

    /// Wait for every scheduled durable write to be attempted.
    pub async fn drain(&self) {
        self.writer.drain().await;
    }

    pub fn write_back_stats(&self) -> WriteBackStats {
        self.writer.stats()
    }

    pub fn fast_store(&self) -> &Arc<dyn FastStore> {
        &self.fast
    }

    pub fn durable_tree(&self) -> &Arc<dyn DurableTree> {
        &self.tree
    }

    pub fn counter(&self) -> &VersionCounter {
        &self.counter
    }

    pub fn layout(&self) -> &TreeLayout {
        &self.config.layout
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Drop the unreadable catalog record and store one rebuilt from the tree.
    ///
    /// The rebuilt catalog is committed against a watch, so a writer that
    /// repaired it first wins and its catalog is returned instead.
    async fn repair_catalog(&self) -> CatalogResult<Catalog> {
        self.fast.delete(keys::CATALOG).await?;
        self.update_catalog(|catalog| Ok(catalog.clone())).await
    }

    /// Allocate a version, reseeding the counter if its value is unreadable.
    async fn allocate_version(&self, project: ProjectNumber) -> CatalogResult<VersionNumber> {
        match self.counter.allocate_next(project).await {
            Err(CatalogError::CacheCorrupt { key, reason }) => {
                warn!(
                    project = %project,
                    key = %key,
                    reason = %reason,
                    "version counter unreadable, repairing"
                );
                let floor = self.highest_known_version(project).await?;
                self.counter.repair(project, floor).await?;
                self.counter.allocate_next(project).await
            }
            other => other,
        }
    }

    /// The highest version of `project` recorded anywhere: the catalog, the
    /// durable tree, or content keys not yet listed in the catalog.
    async fn highest_known_version(
        &self,
        project: ProjectNumber,
    ) -> CatalogResult<VersionNumber> {
        let listed = self
            .get_catalog()
            .await?
            .get(project)
            .and_then(Project::latest_version);
        let stored = self
            .scanner
            .build()
            .await?
            .get(project)
            .and_then(Project::latest_version);
        let mut floor = listed.max(stored).map_or(0, |v| v.get());
        while self
            .fast
            .get(&keys::content(project, VersionNumber::new(floor + 1)))
            .await?
            .is_some()
        {
            floor += 1;
        }
        Ok(VersionNumber::new(floor))
    }

    /// Raise the highest-project scalar to at least `number`.
    async fn raise_highest(&self, number: ProjectNumber) -> CatalogResult<()> {
        let policy = &self.config.retry;
        let max_attempts = policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let watch = self.fast.watch(keys::HIGHEST_PROJECT_NUMBER).await?;
            let current = watch.value().and_then(|raw| parse_integer(raw)).unwrap_or(0);
            if current >= number.get() {
                return Ok(());
            }
            if self
                .fast
                .commit(&watch, Bytes::from(number.to_string()))
                .await?
            {
                debug!(from = current, to = %number, "raised highest project number");
                return Ok(());
            }
            if attempt < max_attempts {
                policy.pause(attempt).await;
            }
        }
        Err(CatalogError::ConcurrencyConflict {
            key: keys::HIGHEST_PROJECT_NUMBER.to_string(),
            attempts: max_attempts,
        })
    }

    /// Apply `apply` to the catalog and commit it if it changed.
    ///
    /// `apply` runs against a fresh snapshot on every attempt. An error from
    /// `apply` aborts the update without writing. A missing or unreadable
    /// record is rebuilt from the durable tree and committed in the same
    /// attempt, so only lost commit races count against the retry cap.
    async fn update_catalog<T, F>(&self, mut apply: F) -> CatalogResult<T>
    where
        F: FnMut(&mut Catalog) -> CatalogResult<T> + Send,
        T: Send,
    {
        let policy = &self.config.retry;
        let max_attempts = policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let watch = self.fast.watch(keys::CATALOG).await?;
            let (current, rebuilt) = match watch.value().map(|raw| decode_catalog(raw)) {
                Some(Ok(catalog)) => (catalog, false),
                Some(Err(e)) => {
                    warn!(error = %e, "catalog cache unreadable during update, rebuilding");
                    (self.scanner.build().await?, true)
                }
                None => {
                    debug!("catalog cache empty during update, rebuilding");
                    (self.scanner.build().await?, true)
                }
            };

            let mut next = current.clone();
            let out = apply(&mut next)?;
            if next == current && !rebuilt {
                return Ok(out);
            }

            let encoded = next
                .to_json()
                .map_err(|e| CatalogError::Serialization(e.to_string()))?;
            if self.fast.commit(&watch, Bytes::from(encoded)).await? {
                return Ok(out);
            }
            debug!(attempt, "catalog commit conflicted, retrying");
            if attempt < max_attempts {
                policy.pause(attempt).await;
            }
        }
        warn!(attempts = max_attempts, "catalog update gave up");
        Err(CatalogError::ConcurrencyConflict {
            key: keys::CATALOG.to_string(),
            attempts: max_attempts,
        })
    }
}

impl std::fmt::Debug for ProjectCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectCatalog")
            .field("config", &self.config)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

fn decode_catalog(raw: &[u8]) -> CatalogResult<Catalog> {
    Catalog::from_json(raw).map_err(|e| CatalogError::CacheCorrupt {
        key: keys::CATALOG.to_string(),
        reason: e.to_string(),
    })
}

fn parse_integer(raw: &[u8]) -> Option<u64> {
    std::str::from_utf8(raw).ok()?.trim().parse().ok()
}
