use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio: numbered projects with append-only versions",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the Folio HTTP server
    Serve(ServeArgs),
    /// Rebuild the catalog from a durable tree and print it
    Scan(ScanArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<String>,
    /// Override the configured durable root
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Args)]
pub struct ScanArgs {
    /// Root directory of the durable tree
    #[arg(long, default_value = "projects")]
    pub root: PathBuf,
}
