use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use folio_catalog::CatalogConfig;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Server settings, usually read from a TOML file.
///
/// ```toml
/// bind_addr = "0.0.0.0:5000"
/// durable_root = "/srv/folio/projects"
/// fast_store_url = "redis://127.0.0.1:6379/0"
///
/// [catalog.retry]
/// max_attempts = 32
///
/// [catalog.write_back]
/// workers = 8
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory the durable tree is rooted at.
    pub durable_root: PathBuf,
    /// Redis URL of the shared fast store. Unset means a private in-memory
    /// store that is rebuilt from the durable tree on every start.
    pub fast_store_url: Option<String>,
    /// Reseed fast-store scalars from the durable tree before serving.
    pub bootstrap_on_start: bool,
    /// Answer CORS preflights from any origin.
    pub permissive_cors: bool,
    pub catalog: CatalogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 5000)),
            durable_root: PathBuf::from("projects"),
            fast_store_url: None,
            bootstrap_on_start: true,
            permissive_cors: false,
            catalog: CatalogConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Apply `FOLIO_BIND_ADDR`, `FOLIO_DURABLE_ROOT` and
    /// `FOLIO_FAST_STORE_URL` from the environment.
    pub fn with_env_overrides(self) -> ServerResult<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply the same overrides as [`with_env_overrides`](Self::with_env_overrides),
    /// reading variables through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        if let Some(addr) = lookup("FOLIO_BIND_ADDR") {
            self.bind_addr = addr
                .parse()
                .map_err(|e| ServerError::Config(format!("FOLIO_BIND_ADDR={addr:?}: {e}")))?;
        }
        if let Some(root) = lookup("FOLIO_DURABLE_ROOT") {
            self.durable_root = PathBuf::from(root);
        }
        if let Some(url) = lookup("FOLIO_FAST_STORE_URL") {
            self.fast_store_url = Some(url).filter(|u| !u.trim().is_empty());
        }
        Ok(self)
    }
}
