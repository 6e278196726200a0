#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const LOG_FILE: &str = "simple-todo.log";

/// Tracing is opt-in via `RUST_LOG`. The TUI owns the terminal, so events go
/// to a file in the data directory instead of stderr.
pub fn init(data_dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    let Some(filter) = env_filter() else {
        return Ok(None);
    };

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    let path = data_dir.join(LOG_FILE);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(Some(path))
}

fn env_filter() -> Option<EnvFilter> {
    let raw = std::env::var("RUST_LOG").ok()?;
    let raw = raw.trim();
    // Ignore empty or absurd filters rather than failing startup.
    if raw.is_empty() || raw.len() > 4096 {
        return None;
    }
    EnvFilter::try_new(raw).ok()
}
