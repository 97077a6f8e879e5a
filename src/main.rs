//! Binary entry point: read the configuration, set up logging, and hand the
//! SQLite-backed catalog to the TUI for the chosen role.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use library_catalog::logging::init_logging;
use library_catalog::{run_app, App, AppConfig, Role, SqliteCatalog};
use tracing::info;

/// Role-gated terminal front end for the book catalog.
#[derive(Parser, Debug)]
#[command(name = "library-catalog")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Start the session with this role instead of prompting (admin, moderator, guest)
    #[arg(short, long)]
    role: Option<Role>,

    /// Log filter (trace, debug, info, warn, error, or EnvFilter directives)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// A missing or invalid configuration ends the process here, before the
/// terminal is taken over.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    let log_path = init_logging(&config.data_dir, &cli.log_level)?;
    info!(
        data_dir = %config.data_dir.display(),
        catalog = %config.catalog,
        log = %log_path.display(),
        "starting library catalog"
    );

    let mut app = App::new(SqliteCatalog::from_config(&config), cli.role);
    run_app(&mut app)
}
