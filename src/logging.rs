//! Tracing setup. The terminal belongs to the TUI, so events are written to a
//! log file in the data directory instead of stderr.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "library-catalog.log";

/// Install the global subscriber. `level` takes `EnvFilter` directives such as
/// `info` or `library_catalog=debug`; an invalid directive falls back to `info`.
pub fn init_logging(data_dir: &Path, level: &str) -> Result<PathBuf> {
    fs::create_dir_all(data_dir).context("failed to create data directory")?;
    let path = data_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(path)
}
