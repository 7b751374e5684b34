use std::sync::Arc;

use folio_catalog::ProjectCatalog;
use folio_store::{FastStore, InMemoryFastStore, LocalDiskTree, RedisFastStore};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;

/// Folio HTTP server.
pub struct FolioServer {
    config: ServerConfig,
    catalog: ProjectCatalog,
}

impl FolioServer {
    /// Build a server over `fast`, with the durable tree rooted at
    /// `config.durable_root`. Must be called from within a tokio runtime.
    pub fn new(config: ServerConfig, fast: Arc<dyn FastStore>) -> ServerResult<Self> {
        let tree = Arc::new(LocalDiskTree::new(&config.durable_root));
        let catalog = ProjectCatalog::new(fast, tree, config.catalog.clone())?;
        Ok(Self { config, catalog })
    }

    /// Build a server over the fast store named by `config.fast_store_url`.
    pub async fn connect(config: ServerConfig) -> ServerResult<Self> {
        let fast = connect_fast_store(&config).await?;
        Self::new(config, fast)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ProjectCatalog {
        &self.catalog
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.catalog.clone(), self.config.permissive_cors)
    }

    /// Bootstrap if configured, then serve until ctrl-c. Pending durable
    /// writes are drained before returning.
    pub async fn serve(self) -> ServerResult<()> {
        if self.config.bootstrap_on_start {
            let report = self.catalog.bootstrap().await?;
            tracing::info!(
                projects = report.projects,
                highest = ?report.highest_project,
                "bootstrapped from {}",
                self.config.durable_root.display()
            );
        }

        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("Folio server listening on {}", self.config.bind_addr);
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        tracing::info!("draining pending durable writes");
        self.catalog.drain().await;
        let stats = self.catalog.write_back_stats();
        tracing::info!(
            written = stats.written,
            failed = stats.failed,
            dropped = stats.dropped,
            "Folio server stopped"
        );
        Ok(())
    }
}

/// Open the configured fast store: Redis when a URL is set, otherwise a
/// process-local in-memory store.
pub async fn connect_fast_store(config: &ServerConfig) -> ServerResult<Arc<dyn FastStore>> {
    match &config.fast_store_url {
        Some(url) => {
            let store = RedisFastStore::connect(url).await?;
            tracing::info!("using redis fast store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::warn!("no fast_store_url configured; using an in-memory fast store");
            Ok(Arc::new(InMemoryFastStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c; shutting down");
    }
}
