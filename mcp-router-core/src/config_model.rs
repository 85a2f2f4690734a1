//! Data model for an [`Instance`] and its on-disk `mcp_settings.json`
//! representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RouterError;
use crate::validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Sse,
    Http,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Sse => "sse",
            Transport::Http => "http",
        }
    }

    fn parse(s: &str) -> Result<Self, RouterError> {
        match s {
            "stdio" => Ok(Transport::Stdio),
            "sse" => Ok(Transport::Sse),
            "http" => Ok(Transport::Http),
            other => Err(RouterError::Validation(format!(
                "Invalid transport type: {other}. Must be one of: stdio, sse, http"
            ))),
        }
    }
}

/// Canonical, validated instance definition, plus the on-disk `metadata`
/// bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub provider: String,
    #[serde(rename = "type")]
    pub transport: Transport,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl Instance {
    /// Validate every field.
    pub fn validate(&self) -> Result<(), RouterError> {
        validate::validate_provider_name(&self.provider)?;
        validate::validate_instance_name(&self.name)?;
        validate::validate_command(&self.command)?;
        validate::validate_args(&self.args)?;
        validate::validate_env(&self.env)?;
        validate::validate_metadata(&self.metadata)?;
        Ok(())
    }

    /// Serialise to the canonical on-disk shape: fields in the fixed order
    /// `name, type, command, args, env, isActive, provider`, followed by
    /// any extra keys (currently only `metadata`) in insertion order.
    pub fn to_canonical_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("type".into(), Value::String(self.transport.as_str().into()));
        map.insert("command".into(), Value::String(self.command.clone()));
        map.insert(
            "args".into(),
            Value::Array(self.args.iter().cloned().map(Value::String).collect()),
        );
        map.insert(
            "env".into(),
            Value::Object(
                self.env
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        );
        map.insert("isActive".into(), Value::Bool(self.is_active));
        map.insert("provider".into(), Value::String(self.provider.clone()));
        if !self.metadata.is_empty() {
            map.insert("metadata".into(), Value::Object(self.metadata.clone()));
        }
        Value::Object(map)
    }

    /// Parse either accepted input shape: a top-level object, or
    /// `{"mcpServers": {"<key>": <object>}}` with exactly one entry. `type`
    /// defaults to `stdio`, `transport` is accepted as a synonym, and
    /// `isActive` defaults to `true`. `provider` is forced to
    /// `provider_dir` when given (the directory the file was loaded from).
    pub fn from_raw_json(raw: &Value, provider_dir: Option<&str>) -> Result<Self, RouterError> {
        let obj = if let Some(servers) = raw.get("mcpServers").and_then(|v| v.as_object()) {
            if servers.len() != 1 {
                return Err(RouterError::Configuration(
                    "mcpServers must contain exactly one entry".into(),
                ));
            }
            servers.values().next().unwrap().clone()
        } else {
            raw.clone()
        };

        let obj = obj
            .as_object()
            .ok_or_else(|| RouterError::Configuration("Config must be a JSON object".into()))?
            .clone();

        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RouterError::Validation("Missing required field: name".into()))?
            .to_string();

        let command = obj
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RouterError::Validation("Missing required field: command".into()))?
            .to_string();

        let transport_str = obj
            .get("type")
            .or_else(|| obj.get("transport"))
            .and_then(|v| v.as_str())
            .unwrap_or("stdio");
        let transport = Transport::parse(transport_str)?;

        let args = obj
            .get("args")
            .map(|v| {
                v.as_array()
                    .ok_or_else(|| RouterError::Validation("'args' must be a list".into()))
                    .map(|arr| {
                        arr.iter()
                            .filter_map(|x| x.as_str().map(String::from))
                            .collect::<Vec<_>>()
                    })
            })
            .transpose()?
            .unwrap_or_default();

        let env = obj
            .get("env")
            .map(|v| {
                v.as_object()
                    .ok_or_else(|| RouterError::Validation("'env' must be a dictionary".into()))
                    .map(|m| {
                        m.iter()
                            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                            .collect::<HashMap<_, _>>()
                    })
            })
            .transpose()?
            .unwrap_or_default();

        let is_active = match obj.get("isActive") {
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(RouterError::Validation("'isActive' must be a boolean".into()));
            }
            None => true,
        };

        let metadata = obj
            .get("metadata")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();

        let provider = provider_dir
            .map(String::from)
            .or_else(|| obj.get("provider").and_then(|v| v.as_str()).map(String::from))
            .ok_or_else(|| RouterError::Validation("Missing required field: provider".into()))?;

        let instance = Instance {
            name,
            provider,
            transport,
            command,
            args,
            env,
            is_active,
            metadata,
        };
        instance.validate()?;
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trip_canonical_shape() {
        let raw = json!({
            "name": "weather",
            "transport": "stdio",
            "command": "weather-server",
            "args": ["--verbose"],
        });
        let instance = Instance::from_raw_json(&raw, Some("weather_provider")).unwrap();
        assert_eq!(instance.transport, Transport::Stdio);
        assert!(instance.is_active);

        let canonical = instance.to_canonical_json();
        let keys: Vec<_> = canonical.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys[0], "name");
        assert_eq!(keys[1], "type");
        assert_eq!(keys[2], "command");
    }

    #[test]
    fn mcp_servers_shape_is_accepted() {
        let raw = json!({
            "mcpServers": {
                "weather": {
                    "name": "weather",
                    "command": "weather-server",
                }
            }
        });
        let instance = Instance::from_raw_json(&raw, Some("weather_provider")).unwrap();
        assert_eq!(instance.name, "weather");
    }
}
