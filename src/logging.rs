use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Logs to stderr so CLI output stays clean on stdout.
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Appends plain-text logs to `path`.
pub fn init_file(path: impl AsRef<Path>, default_level: &str) -> Result<()> {
    let path = path.as_ref();
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .try_init();
    Ok(())
}
