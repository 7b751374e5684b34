use serde::{Deserialize, Serialize};

use crate::layout::TreeLayout;
use crate::retry::RetryPolicy;
use crate::writeback::WriteBackConfig;

/// Configuration for a [`ProjectCatalog`](crate::ProjectCatalog).
///
/// Every section falls back to its defaults when omitted, so an empty TOML
/// table is a valid configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Bounds on optimistic-commit retries.
    pub retry: RetryPolicy,
    /// Background durable-write queue and worker pool.
    pub write_back: WriteBackConfig,
    /// Naming of directories and blobs in the durable tree.
    pub layout: TreeLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.retry.max_attempts, 16);
        assert_eq!(config.write_back.workers, 4);
        assert_eq!(config.write_back.queue_capacity, 1024);
        assert_eq!(config.layout.project_prefix, "project");
        assert_eq!(config.layout.content_file, "index.html");
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: CatalogConfig =
            serde_json::from_str(r#"{"retry":{"max_attempts":3},"write_back":{"workers":1}}"#)
                .unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.max_delay_ms, RetryPolicy::default().max_delay_ms);
        assert_eq!(config.write_back.workers, 1);
        assert_eq!(config.write_back.queue_capacity, 1024);
        assert_eq!(config.layout, TreeLayout::default());
    }
}
