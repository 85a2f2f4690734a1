//! Config store: reads and writes the per-provider
//! `<data>/<provider>/mcp_settings.json` files.
//!
//! Loading scans every provider subdirectory and skips unreadable or
//! oversized files with a warning rather than aborting the whole load. A
//! missing or empty settings file is treated as zero configured instances,
//! not an error.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use crate::config_model::Instance;
use crate::error::RouterError;
use crate::validate;

const MAX_CONFIG_FILE_BYTES: u64 = 10 * 1024 * 1024;
const SETTINGS_FILE_NAME: &str = "mcp_settings.json";

pub struct ConfigStore {
    data_dir: PathBuf,
}

impl ConfigStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn settings_path(&self, provider: &str) -> Result<PathBuf, RouterError> {
        validate::validate_provider_name(provider)?;
        let provider_dir = self.data_dir.join(provider);
        fs::create_dir_all(&provider_dir)
            .map_err(|e| RouterError::Configuration(format!("failed to create provider dir: {e}")))?;
        let rel = PathBuf::from(provider).join(SETTINGS_FILE_NAME);
        validate::validate_path(&self.data_dir, &rel)
    }

    /// Scan every provider subdirectory for an `mcp_settings.json`, parse
    /// it, and return every instance found. A single bad provider
    /// directory is logged and skipped rather than aborting the whole
    /// load.
    pub fn load_all(&self) -> Result<Vec<Instance>, RouterError> {
        fs::create_dir_all(&self.data_dir)
            .map_err(|e| RouterError::Configuration(format!("failed to create data dir: {e}")))?;

        let mut instances = Vec::new();
        let entries = fs::read_dir(&self.data_dir)
            .map_err(|e| RouterError::Configuration(format!("failed to read data dir: {e}")))?;

        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.path().is_dir() {
                continue;
            }
            let provider = entry.file_name().to_string_lossy().to_string();
            match self.load_provider(&provider) {
                Ok(Some(instance)) => instances.push(instance),
                Ok(None) => {}
                Err(e) => warn!(provider = %provider, error = %e, "skipping invalid provider config"),
            }
        }
        Ok(instances)
    }

    fn load_provider(&self, provider: &str) -> Result<Option<Instance>, RouterError> {
        let path = self.settings_path(provider)?;
        if !path.exists() {
            return Ok(None);
        }

        let metadata = fs::metadata(&path)
            .map_err(|e| RouterError::Configuration(format!("failed to stat '{}': {e}", path.display())))?;
        if metadata.len() > MAX_CONFIG_FILE_BYTES {
            return Err(RouterError::Configuration(format!(
                "config file '{}' exceeds {} byte limit",
                path.display(),
                MAX_CONFIG_FILE_BYTES
            )));
        }
        if metadata.len() == 0 {
            return Ok(None);
        }

        let raw = fs::read_to_string(&path)
            .map_err(|e| RouterError::Configuration(format!("failed to read '{}': {e}", path.display())))?;
        let parsed: Value = serde_json::from_str(&raw)
            .map_err(|e| RouterError::Configuration(format!("invalid JSON in '{}': {e}", path.display())))?;

        Instance::from_raw_json(&parsed, Some(provider)).map(Some)
    }

    /// Write `instance` to its provider directory using a temp-file +
    /// rename so a crash mid-write never leaves a truncated config.
    pub fn save_instance(&self, instance: &Instance) -> Result<(), RouterError> {
        let path = self.settings_path(&instance.provider)?;
        let dir = path
            .parent()
            .ok_or_else(|| RouterError::Internal("settings path has no parent".into()))?;
        fs::create_dir_all(dir)
            .map_err(|e| RouterError::Configuration(format!("failed to create provider dir: {e}")))?;

        let body = serde_json::to_string_pretty(&instance.to_canonical_json())
            .map_err(|e| RouterError::Internal(format!("failed to serialise instance: {e}")))?;

        let tmp_path = dir.join(format!("{SETTINGS_FILE_NAME}.tmp"));
        fs::write(&tmp_path, body)
            .map_err(|e| RouterError::Configuration(format!("failed to write '{}': {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &path)
            .map_err(|e| RouterError::Configuration(format!("failed to finalise '{}': {e}", path.display())))?;
        Ok(())
    }

    pub fn remove_instance(&self, instance: &Instance) -> Result<(), RouterError> {
        let path = self.settings_path(&instance.provider)?;
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| RouterError::Configuration(format!("failed to remove '{}': {e}", path.display())))?;
        }
        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir(dir); // best-effort: only succeeds if now empty
        }
        Ok(())
    }

    /// Flip `isActive` for the named instance, searching every provider
    /// directory since the caller may not know which provider owns it.
    pub fn set_active(&self, name: &str, active: bool) -> Result<(), RouterError> {
        for instance in self.load_all()? {
            if instance.name == name {
                let mut updated = instance;
                updated.is_active = active;
                return self.save_instance(&updated);
            }
        }
        Err(RouterError::instance_not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, provider: &str) -> Instance {
        Instance::from_raw_json(
            &serde_json::json!({
                "name": name,
                "command": "echo",
                "args": ["hi"],
            }),
            Some(provider),
        )
        .unwrap()
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        let instance = sample("weather", "weather_provider");
        store.save_instance(&instance).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "weather");
    }

    #[test]
    fn set_active_flips_flag_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        store.save_instance(&sample("weather", "weather_provider")).unwrap();

        store.set_active("weather", false).unwrap();
        let loaded = store.load_all().unwrap();
        assert!(!loaded[0].is_active);
    }

    #[test]
    fn empty_file_is_skipped_not_errored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty_provider")).unwrap();
        fs::write(dir.path().join("empty_provider").join(SETTINGS_FILE_NAME), "").unwrap();

        let store = ConfigStore::new(dir.path());
        assert!(store.load_all().unwrap().is_empty());
    }
}
