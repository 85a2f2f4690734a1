//! Config file watcher: logs changes under the data directory.
//!
//! This watcher never hot-reloads a live session: a changed
//! `mcp_settings.json` is logged only. Picking up the change requires a
//! process restart or an explicit `add`/`remove`/`enable`/`disable` call —
//! a stale session otherwise disagreeing with the file on disk is a known
//! limitation, not a bug this component works around.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

const DEBOUNCE: Duration = Duration::from_millis(500);
const SETTINGS_FILE_NAME: &str = "mcp_settings.json";

pub struct FileWatcher {
    stop: Option<std::sync::mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl FileWatcher {
    /// Start watching `data_dir` recursively on a dedicated OS thread
    /// (the `notify` crate's callback API is synchronous, so it does not
    /// fit naturally on the async runtime).
    pub fn start(data_dir: PathBuf) -> Result<Self, notify::Error> {
        let (event_tx, event_rx) = channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(event_tx, Config::default())?;
        watcher.watch(&data_dir, RecursiveMode::Recursive)?;

        let (stop_tx, stop_rx) = channel::<()>();
        let handle = std::thread::spawn(move || {
            // Keep the watcher alive for the life of the thread.
            let _watcher = watcher;
            let mut last_seen: HashMap<PathBuf, Instant> = HashMap::new();

            loop {
                if stop_rx.try_recv().is_ok() {
                    break;
                }
                match event_rx.recv_timeout(Duration::from_millis(200)) {
                    Ok(Ok(event)) => handle_event(event, &mut last_seen),
                    Ok(Err(e)) => warn!(error = %e, "watch error"),
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("config watcher stopped");
        });

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_event(event: Event, last_seen: &mut HashMap<PathBuf, Instant>) {
    for path in event.paths {
        if !is_settings_file(&path) {
            continue;
        }
        if let Some(last) = last_seen.get(&path) {
            if last.elapsed() < DEBOUNCE {
                continue;
            }
        }
        last_seen.insert(path.clone(), Instant::now());
        info!(path = %path.display(), kind = ?event.kind, "mcp_settings.json changed on disk; restart or use mcp.router.add/remove to pick it up");
    }
}

fn is_settings_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n == SETTINGS_FILE_NAME)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_settings_file_name() {
        assert!(is_settings_file(Path::new("/data/weather/mcp_settings.json")));
        assert!(!is_settings_file(Path::new("/data/weather/other.json")));
    }
}
