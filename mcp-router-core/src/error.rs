//! Error taxonomy shared by every component of the router.
//!
//! Each variant carries a human-readable message and maps to a stable
//! wire-level `code` string. The router never lets a Rust panic or a raw
//! `Debug` representation leak to the upstream host: everything surfaced
//! across the server façade goes through [`RouterError::to_json`].

use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("{0}")]
    Configuration(String),

    #[error("{0}")]
    Validation(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Tool '{tool}' not found in instance '{instance}'")]
    ToolNotFound { tool: String, instance: String },

    #[error("Timeout exceeded: {0}s")]
    Timeout(f64),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Security(String),

    #[error("{0}")]
    Internal(String),
}

impl RouterError {
    /// The stable wire-level error code used in `{"error": ..., "code": ...}` payloads.
    pub fn code(&self) -> &'static str {
        match self {
            RouterError::Configuration(_) => "CONFIG_ERROR",
            RouterError::Validation(_) => "VALIDATION_ERROR",
            RouterError::InstanceNotFound(_) => "INSTANCE_NOT_FOUND",
            RouterError::ToolNotFound { .. } => "TOOL_NOT_FOUND",
            RouterError::Timeout(_) => "TIMEOUT",
            RouterError::Transport(_) => "TRANSPORT_ERROR",
            RouterError::Security(_) => "SECURITY_ERROR",
            RouterError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Serialise as the `{"error": "...", "code": "..."}` shape the server
    /// façade embeds in its text content parts.
    pub fn to_json(&self) -> Value {
        json!({ "error": self.to_string(), "code": self.code() })
    }

    pub fn instance_not_found(name: impl Into<String>) -> Self {
        RouterError::InstanceNotFound(name.into())
    }

    pub fn tool_not_found(tool: impl Into<String>, instance: impl Into<String>) -> Self {
        RouterError::ToolNotFound {
            tool: tool.into(),
            instance: instance.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
