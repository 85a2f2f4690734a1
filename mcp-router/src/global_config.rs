//! Global router configuration (`config.json`), distinct from the
//! per-provider `mcp_settings.json` files `mcp-router-core` manages.
//!
//! A 10MiB size cap and empty-file-means-defaults rule, a fixed default
//! section layout (`api`, `server`, `mcp_client`, `security`, `logging`,
//! `watcher`), and dot-notation `get`/`set` key access.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

const MAX_CONFIG_FILE_BYTES: u64 = 10 * 1024 * 1024;

pub struct GlobalConfig {
    path: PathBuf,
    values: Value,
}

impl GlobalConfig {
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let metadata = fs::metadata(&path)?;
            if metadata.len() == 0 {
                default_config()
            } else if metadata.len() > MAX_CONFIG_FILE_BYTES {
                anyhow::bail!("config file '{}' exceeds {} byte limit", path.display(), MAX_CONFIG_FILE_BYTES);
            } else {
                let raw = fs::read_to_string(&path)?;
                serde_json::from_str(&raw)?
            }
        } else {
            default_config()
        };
        Ok(Self { path, values })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, body)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dot-notation lookup, e.g. `get("server.port")`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut current = &self.values;
        for part in key.split('.') {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Dot-notation set, creating intermediate objects as needed.
    pub fn set(&mut self, key: &str, value: Value) {
        let parts: Vec<&str> = key.split('.').collect();
        let mut current = &mut self.values;
        for part in &parts[..parts.len() - 1] {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current = current
                .as_object_mut()
                .unwrap()
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if let Some(last) = parts.last() {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            current.as_object_mut().unwrap().insert(last.to_string(), value);
        }
    }

    pub fn all(&self) -> &Value {
        &self.values
    }
}

fn default_config() -> Value {
    json!({
        "api": {
            "enabled": false,
            "host": "127.0.0.1",
            "port": 8000,
            "cors_origin": "*",
            "auto_find_port": true,
            "enable_realtime_logs": false,
        },
        "server": {
            "enabled": true,
            "transport_type": "stdio",
            "allow_instance_management": false,
            "host": "127.0.0.1",
            "http": { "port": 3000 },
            "sse": { "port": 3001 },
        },
        "mcp_client": {
            "timeout": 30,
        },
        "security": {
            "bearer_token": "",
            "enable_validation": true,
        },
        "logging": {
            "level": "INFO",
            "format": "%(asctime)s %(levelname)s %(name)s %(message)s",
            "directory": "logs",
        },
        "watcher": {
            "enabled": true,
            "watch_path": "data",
            "debounce_delay": 1.0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "").unwrap();
        let config = GlobalConfig::load(&path).unwrap();
        assert_eq!(config.get("server.transport_type").unwrap(), "stdio");
        assert_eq!(config.get("server.allow_instance_management").unwrap(), false);
    }

    #[test]
    fn dot_notation_get_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GlobalConfig::load(dir.path().join("config.json")).unwrap();
        config.set("api.port", json!(9000));
        assert_eq!(config.get("api.port").unwrap(), 9000);
    }
}
