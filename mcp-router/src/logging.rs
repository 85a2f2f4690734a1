//! Logging setup: `tracing-subscriber` to stderr, plus a rotated log
//! file. Any existing `latest.txt` is renamed to `YY.MM.DD-HH-MM[-n].txt`
//! (using its mtime) before a fresh `latest.txt` is opened for the new run.
//!
//! stdout is reserved for the JSON-RPC stream in stdio mode (teacher's
//! `run_server_stdio` comment: "All logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol stream"), so every subscriber
//! layer here writes to stderr or to the log file, never stdout.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

const LATEST_FILE_NAME: &str = "latest.txt";

/// Rename an existing `latest.txt` out of the way using its last-modified
/// timestamp, retrying with a `-n` suffix on collision.
fn rotate_latest(log_dir: &Path) -> std::io::Result<()> {
    let latest = log_dir.join(LATEST_FILE_NAME);
    if !latest.exists() {
        return Ok(());
    }

    let modified = fs::metadata(&latest)?.modified()?;
    let timestamp: DateTime<Local> = modified.into();
    let base_name = timestamp.format("%y.%m.%d-%H-%M").to_string();

    let mut candidate = log_dir.join(format!("{base_name}.txt"));
    let mut n = 1;
    while candidate.exists() {
        candidate = log_dir.join(format!("{base_name}-{n}.txt"));
        n += 1;
    }
    fs::rename(&latest, &candidate)
}

pub fn init(log_dir: impl Into<PathBuf>, level: &str) -> anyhow::Result<()> {
    let log_dir = log_dir.into();
    fs::create_dir_all(&log_dir)?;
    rotate_latest(&log_dir)?;

    let file = fs::File::create(log_dir.join(LATEST_FILE_NAME))?;
    let file_writer = move || file.try_clone().expect("failed to clone log file handle");
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(BoxMakeWriter::new(std::io::stderr.and(file_writer)))
        .with_ansi(false)
        .init();

    Ok(())
}
