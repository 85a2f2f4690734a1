//! Name/command/arg/env/path sanitisation.
//!
//! Pure functions, invoked from every entry point that accepts an
//! externally-supplied name, command, arg list, env map or path: the
//! instance registry on load and on `add`, the config store on
//! normalisation, and the router/server façade before dispatch.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RouterError;

const MAX_NAME_LEN: usize = 100;
const MAX_COMMAND_LEN: usize = 1000;
const MAX_ARG_LEN: usize = 1000;
const MAX_ARGS: usize = 100;
const MAX_ENV_ENTRIES: usize = 100;
const MAX_METADATA_ENTRIES: usize = 50;

/// `provider` is the on-disk directory name: ASCII only.
static PROVIDER_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// `name` is the display identifier and may contain Unicode letters/digits.
static INSTANCE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{L}\p{N}_-]+$").unwrap());

/// Shell-identifier env var keys.
static ENV_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Command-injection metacharacter set banned from commands and args.
const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '$', '`', '\n', '\r'];

pub fn validate_provider_name(name: &str) -> Result<(), RouterError> {
    if name.is_empty() {
        return Err(RouterError::Validation("Provider name cannot be empty".into()));
    }
    if !PROVIDER_NAME_PATTERN.is_match(name) {
        return Err(RouterError::Validation(format!(
            "Invalid provider name: '{name}'. Only alphanumeric characters, underscores, and hyphens are allowed"
        )));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(RouterError::Validation("Provider name too long (max 100 characters)".into()));
    }
    Ok(())
}

pub fn validate_instance_name(name: &str) -> Result<(), RouterError> {
    if name.is_empty() {
        return Err(RouterError::Validation("Instance name cannot be empty".into()));
    }
    if !INSTANCE_NAME_PATTERN.is_match(name) {
        return Err(RouterError::Validation(format!(
            "Invalid instance name: '{name}'. Only Unicode letters, digits, underscores and hyphens are allowed"
        )));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(RouterError::Validation("Instance name too long (max 100 characters)".into()));
    }
    Ok(())
}

fn contains_shell_metacharacter(s: &str) -> bool {
    s.chars().any(|c| SHELL_METACHARACTERS.contains(&c))
}

pub fn validate_command(command: &str) -> Result<(), RouterError> {
    if command.is_empty() {
        return Err(RouterError::Validation("Command cannot be empty".into()));
    }
    if command.len() > MAX_COMMAND_LEN {
        return Err(RouterError::Validation("Command too long (max 1000 characters)".into()));
    }
    if contains_shell_metacharacter(command) {
        return Err(RouterError::Validation(format!(
            "Command '{command}' contains disallowed shell metacharacters"
        )));
    }
    Ok(())
}

pub fn validate_args(args: &[String]) -> Result<(), RouterError> {
    if args.len() > MAX_ARGS {
        return Err(RouterError::Validation(format!(
            "Too many arguments: {} (max {MAX_ARGS})",
            args.len()
        )));
    }
    for arg in args {
        if arg.len() > MAX_ARG_LEN {
            return Err(RouterError::Validation("Argument too long (max 1000 characters)".into()));
        }
        if contains_shell_metacharacter(arg) {
            return Err(RouterError::Validation(format!(
                "Argument '{arg}' contains disallowed shell metacharacters"
            )));
        }
    }
    Ok(())
}

pub fn validate_env(env: &std::collections::HashMap<String, String>) -> Result<(), RouterError> {
    if env.len() > MAX_ENV_ENTRIES {
        return Err(RouterError::Validation(format!(
            "Too many environment entries: {} (max {MAX_ENV_ENTRIES})",
            env.len()
        )));
    }
    for key in env.keys() {
        if !ENV_KEY_PATTERN.is_match(key) {
            return Err(RouterError::Validation(format!(
                "Invalid environment variable name: '{key}'"
            )));
        }
    }
    Ok(())
}

pub fn validate_metadata(metadata: &serde_json::Map<String, serde_json::Value>) -> Result<(), RouterError> {
    if metadata.len() > MAX_METADATA_ENTRIES {
        return Err(RouterError::Validation(format!(
            "Too many metadata entries: {} (max {MAX_METADATA_ENTRIES})",
            metadata.len()
        )));
    }
    Ok(())
}

/// Resolve `path` under `base` and ensure the resolved path never escapes
/// `base` (lexical prefix check on the resolved absolute path).
pub fn validate_path(base: &Path, path: &Path) -> Result<PathBuf, RouterError> {
    let base = base
        .canonicalize()
        .map_err(|e| RouterError::Validation(format!("Invalid base path: {e}")))?;

    let candidate = base.join(path);
    // `candidate` may not exist yet (e.g. a config file we're about to
    // write), so canonicalise the parent directory and re-append the
    // file name rather than requiring the whole path to exist.
    let resolved = if candidate.exists() {
        candidate
            .canonicalize()
            .map_err(|e| RouterError::Validation(format!("Invalid path: {e}")))?
    } else {
        let parent = candidate.parent().unwrap_or(&candidate);
        let parent = if parent.exists() {
            parent
                .canonicalize()
                .map_err(|e| RouterError::Validation(format!("Invalid path: {e}")))?
        } else {
            base.clone()
        };
        match candidate.file_name() {
            Some(name) => parent.join(name),
            None => parent,
        }
    };

    if !resolved.starts_with(&base) {
        return Err(RouterError::Validation(format!(
            "Path traversal detected: '{}' is outside base directory",
            path.display()
        )));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_rejects_unicode() {
        assert!(validate_provider_name("caf\u{e9}").is_err());
        assert!(validate_provider_name("weather_api-v2").is_ok());
    }

    #[test]
    fn instance_name_allows_unicode() {
        assert!(validate_instance_name("\u{5929}\u{6c14}_api").is_ok());
        assert!(validate_instance_name("").is_err());
    }

    #[test]
    fn command_rejects_shell_metacharacters() {
        assert!(validate_command("echo hi; rm -rf /").is_err());
        assert!(validate_command("/usr/bin/echo").is_ok());
    }

    #[test]
    fn path_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("provider")).unwrap();
        let ok = validate_path(dir.path(), Path::new("provider/mcp_settings.json"));
        assert!(ok.is_ok());
        let escape = validate_path(dir.path(), Path::new("../../etc/passwd"));
        assert!(escape.is_err());
    }
}
