//! Startup reconciliation of fast-store scalars against the durable tree.

use bytes::Bytes;
use folio_store::FastStore;
use folio_types::{keys, ProjectNumber, VersionNumber};
use serde::Serialize;
use tracing::{debug, info};

use crate::counter::VersionCounter;
use crate::error::CatalogResult;
use crate::scanner::ReconciliationScanner;

/// What a bootstrap pass found in the durable tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    /// Number of projects in the rebuilt catalog.
    pub projects: usize,
    /// Highest project number, `None` if the tree holds no projects.
    pub highest_project: Option<ProjectNumber>,
}

/// Rebuild the catalog and reseed the highest-project scalar and every
/// project's version counter from what the durable tree holds.
///
/// Seeding overwrites whatever the fast store held, so running it twice
/// against an unchanged tree leaves the same state.
pub(crate) async fn bootstrap(
    fast: &dyn FastStore,
    scanner: &ReconciliationScanner,
    counter: &VersionCounter,
) -> CatalogResult<BootstrapReport> {
    let catalog = scanner.scan().await?;
    let highest = catalog.highest_project();

    fast.set(
        keys::HIGHEST_PROJECT_NUMBER,
        Bytes::from(highest.map_or(0, ProjectNumber::get).to_string()),
    )
    .await?;

    for project in &catalog {
        let latest = project.latest_version().unwrap_or(VersionNumber::new(0));
        counter.seed(project.number, latest).await?;
        debug!(project = %project.number, counter = %latest, "seeded version counter");
    }

    let report = BootstrapReport {
        projects: catalog.len(),
        highest_project: highest,
    };
    info!(
        projects = report.projects,
        highest = highest.map_or(0, ProjectNumber::get),
        "bootstrap complete"
    );
    Ok(report)
}
