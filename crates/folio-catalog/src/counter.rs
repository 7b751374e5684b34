use std::sync::Arc;

use bytes::Bytes;
use folio_store::FastStore;
use folio_types::{keys, ProjectNumber, VersionNumber};
use tracing::{debug, warn};

use crate::error::{CatalogError, CatalogResult};

/// Per-project version allocator.
///
/// Allocation is a single atomic increment on the fast store, never a
/// read-then-write, so concurrent callers always receive distinct numbers.
#[derive(Clone)]
pub struct VersionCounter {
    fast: Arc<dyn FastStore>,
}

impl VersionCounter {
    pub fn new(fast: Arc<dyn FastStore>) -> Self {
        Self { fast }
    }

    /// Allocate the next version number for `project`.
    ///
    /// A counter that was never initialized starts from 0, so the first
    /// allocation returns 1.
    pub async fn allocate_next(&self, project: ProjectNumber) -> CatalogResult<VersionNumber> {
        let value = self
            .fast
            .increment(&keys::version_counter(project))
            .await?;
        debug!(project = %project, version = value, "allocated version");
        Ok(VersionNumber::new(value))
    }

    /// Set the counter to 0 unless it already exists.
    ///
    /// Returns `true` if the counter was created.
    pub async fn initialize(&self, project: ProjectNumber) -> CatalogResult<bool> {
        Ok(self
            .fast
            .set_if_absent(&keys::version_counter(project), Bytes::from_static(b"0"))
            .await?)
    }

    /// Overwrite the counter. Only bootstrap does this.
    pub async fn seed(&self, project: ProjectNumber, value: VersionNumber) -> CatalogResult<()> {
        self.fast
            .set(&keys::version_counter(project), Bytes::from(value.to_string()))
            .await?;
        Ok(())
    }

    /// The most recently allocated version, or 0 if none.
    pub async fn current(&self, project: ProjectNumber) -> CatalogResult<VersionNumber> {
        let key = keys::version_counter(project);
        match self.fast.get(&key).await? {
            None => Ok(VersionNumber::new(0)),
            Some(raw) => parse_counter(&raw).ok_or(CatalogError::CacheCorrupt {
                key,
                reason: "counter is not a decimal integer".into(),
            }),
        }
    }

    /// Replace an unreadable counter with `floor`.
    ///
    /// A counter that already holds an integer is left alone, so concurrent
    /// repairs cannot roll back an allocation made after the first one.
    /// Returns `true` if this call wrote the counter.
    pub async fn repair(
        &self,
        project: ProjectNumber,
        floor: VersionNumber,
    ) -> CatalogResult<bool> {
        let watch = self.fast.watch(&keys::version_counter(project)).await?;
        if watch.value().is_some_and(|raw| parse_counter(raw).is_some()) {
            return Ok(false);
        }
        let written = self
            .fast
            .commit(&watch, Bytes::from(floor.to_string()))
            .await?;
        if written {
            warn!(project = %project, floor = %floor, "reseeded version counter");
        }
        Ok(written)
    }
}

fn parse_counter(raw: &[u8]) -> Option<VersionNumber> {
    std::str::from_utf8(raw).ok()?.parse().ok()
}

impl std::fmt::Debug for VersionCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionCounter").finish_non_exhaustive()
    }
}
