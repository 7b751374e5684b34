use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use folio_catalog::ReconciliationScanner;
use folio_server::{FolioServer, ServerConfig};
use folio_store::{InMemoryFastStore, LocalDiskTree};
use folio_types::Catalog;

use crate::cli::{Cli, Command, OutputFormat, ScanArgs, ServeArgs};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    match cli.command {
        Command::Serve(args) => runtime.block_on(cmd_serve(args)),
        Command::Scan(args) => {
            let catalog = runtime.block_on(scan(&args.root))?;
            print!("{}", render_catalog(&catalog, cli.format)?);
            Ok(())
        }
    }
}

fn load_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    load_config_with(args, |name| std::env::var(name).ok())
}

/// File, then environment (through `lookup`), then command-line flags.
fn load_config_with(
    args: &ServeArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    }
    .with_overrides(lookup)?;

    if let Some(bind) = &args.bind {
        config.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid --bind address {bind:?}"))?;
    }
    if let Some(root) = &args.root {
        config.durable_root = root.clone();
    }
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    println!(
        "{} Folio server on {} (root: {}, fast store: {})",
        "✓".green().bold(),
        config.bind_addr.to_string().bold(),
        config.durable_root.display(),
        if config.fast_store_url.is_some() { "redis" } else { "in-memory" }
    );
    let server = FolioServer::connect(config)
        .await
        .context("failed to start the server")?;
    server.serve().await?;
    Ok(())
}

async fn scan(root: &Path) -> anyhow::Result<Catalog> {
    let tree = Arc::new(LocalDiskTree::new(root));
    let scanner = ReconciliationScanner::new(tree, Arc::new(InMemoryFastStore::new()));
    scanner
        .build()
        .await
        .with_context(|| format!("failed to scan {}", root.display()))
}

fn render_catalog(catalog: &Catalog, format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        let mut out = serde_json::to_string_pretty(catalog)?;
        out.push('\n');
        return Ok(out);
    }

    if catalog.is_empty() {
        return Ok(format!("{}\n", "No projects found.".dimmed()));
    }
    let mut out = String::new();
    for project in catalog {
        let versions: Vec<String> = project.versions.iter().map(|v| v.to_string()).collect();
        let latest = project
            .latest_version()
            .map(|v| format!("latest {v}").green().to_string())
            .unwrap_or_else(|| "empty".dimmed().to_string());
        out.push_str(&format!(
            "{}  {}  [{}]\n",
            format!("project {}", project.number).yellow().bold(),
            latest,
            versions.join(", ")
        ));
    }
    out.push_str(&format!(
        "{} projects, highest {}\n",
        catalog.len().to_string().bold(),
        catalog
            .highest_project()
            .map_or_else(|| "-".to_string(), |n| n.to_string())
            .cyan()
    ));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for path in ["project2/1", "project2/3", "project10", "notes"] {
            std::fs::create_dir_all(dir.path().join(path)).unwrap();
        }
        std::fs::write(dir.path().join("project2/3/index.html"), "x").unwrap();
        dir
    }

    #[tokio::test]
    async fn scan_reads_a_directory() {
        let dir = fixture();
        let catalog = scan(dir.path()).await.unwrap();
        let numbers: Vec<u64> = catalog.iter().map(|p| p.number.get()).collect();
        assert_eq!(numbers, vec![10, 2]);
    }

    #[tokio::test]
    async fn render_text_and_json() {
        colored::control::set_override(false);
        let dir = fixture();
        let catalog = scan(dir.path()).await.unwrap();

        let text = render_catalog(&catalog, OutputFormat::Text).unwrap();
        assert!(text.contains("project 2  latest 3  [1, 3]"));
        assert!(text.contains("project 10  empty  []"));
        assert!(text.ends_with("2 projects, highest 10\n"));

        let json = render_catalog(&catalog, OutputFormat::Json).unwrap();
        let parsed = Catalog::from_json(json.as_bytes()).unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn render_empty() {
        colored::control::set_override(false);
        let text = render_catalog(&Catalog::new(), OutputFormat::Text).unwrap();
        assert_eq!(text, "No projects found.\n");
    }

    #[test]
    fn flags_override_config() {
        let args = ServeArgs {
            config: None,
            bind: Some("0.0.0.0:9000".into()),
            root: Some(PathBuf::from("/data")),
        };
        let env = |name: &str| match name {
            "FOLIO_BIND_ADDR" => Some("10.1.1.1:7000".to_string()),
            "FOLIO_DURABLE_ROOT" => Some("/env".to_string()),
            _ => None,
        };
        let config = load_config_with(&args, env).unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.durable_root, PathBuf::from("/data"));

        let bad = ServeArgs {
            config: None,
            bind: Some("nowhere".into()),
            root: None,
        };
        assert!(load_config_with(&bad, |_| None).is_err());
    }

    #[test]
    fn environment_fills_unset_flags() {
        let args = ServeArgs {
            config: None,
            bind: None,
            root: None,
        };
        let config = load_config_with(&args, |name| match name {
            "FOLIO_DURABLE_ROOT" => Some("/env".to_string()),
            "FOLIO_FAST_STORE_URL" => Some("redis://127.0.0.1/".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.durable_root, PathBuf::from("/env"));
        assert_eq!(config.fast_store_url.as_deref(), Some("redis://127.0.0.1/"));
    }
}
