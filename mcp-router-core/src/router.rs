//! Router: the `mcp.router.*` meta-tool semantics layered over the
//! [`InstanceRegistry`].
//!
//! Management operations (`use`/`add`/`remove`/`enable`/`disable`) return a
//! plain `"Done"` / `"Error: ..."` string. `list`, `help` and `call` return
//! their actual JSON payload, with errors encoded as
//! `{"error": ..., "code": ...}` rather than folded into a text message.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::config_model::Instance;
use crate::registry::InstanceRegistry;

pub struct Router {
    registry: Arc<InstanceRegistry>,
    current: RwLock<Option<String>>,
}

impl Router {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self {
            registry,
            current: RwLock::new(None),
        }
    }

    pub async fn current_instance(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// Select the active instance for subsequent bare `call`s.
    pub async fn use_instance(&self, name: &str) -> String {
        match self.registry.get(name).await {
            Ok(_) => {
                *self.current.write().await = Some(name.to_string());
                "Done".to_string()
            }
            Err(e) => format!("Error: {e}"),
        }
    }

    /// Ordered list of `{name, provider, active, connected, transport,
    /// tools_count, metadata}`, one entry per registered instance.
    pub async fn list(&self) -> Value {
        let sessions = self.registry.list().await;
        let mut items = Vec::with_capacity(sessions.len());
        for session in sessions {
            items.push(session.describe().await);
        }
        Value::Array(items)
    }

    /// With no instance name: mapping from instance name to its tool
    /// catalogue (only active, connected instances contribute). With a
    /// name: the tool catalogue of that instance alone, or an
    /// `{"error": ..., "code": ...}` object if it doesn't exist.
    pub async fn help(&self, instance_name: Option<&str>) -> Value {
        match instance_name {
            None => {
                let sessions = self.registry.list().await;
                let mut catalogue = serde_json::Map::with_capacity(sessions.len());
                for session in sessions {
                    if session.is_active() && session.is_connected().await {
                        let tools = serde_json::to_value(session.list_tools().await).unwrap_or(Value::Array(vec![]));
                        catalogue.insert(session.instance.name.clone(), tools);
                    }
                }
                Value::Object(catalogue)
            }
            Some(name) => match self.registry.get(name).await {
                Ok(session) => serde_json::to_value(session.list_tools().await).unwrap_or(Value::Array(vec![])),
                Err(e) => e.to_json(),
            },
        }
    }

    /// Call `tool` on `instance` (or on the currently `use`d instance if
    /// `instance` is `None`) and return its JSON content, or an
    /// `{"error": ..., "code": ...}` object on failure.
    pub async fn call(&self, instance: Option<&str>, tool: &str, arguments: Value) -> Value {
        let target = match instance.map(str::to_string).or(self.current_instance().await) {
            Some(name) => name,
            None => {
                return crate::error::RouterError::Validation("no instance selected; call mcp.router.use first".into()).to_json();
            }
        };

        let session = match self.registry.get(&target).await {
            Ok(s) => s,
            Err(e) => return e.to_json(),
        };

        match session.call(tool, arguments, None).await {
            Ok(result) => serde_json::to_value(result).unwrap_or_else(|e| json!({"error": e.to_string(), "code": "INTERNAL_ERROR"})),
            Err(e) => e.to_json(),
        }
    }

    pub async fn add(&self, instance: Instance) -> String {
        match self.registry.add(instance).await {
            Ok(()) => "Done".to_string(),
            Err(e) => format!("Error: {e}"),
        }
    }

    pub async fn remove(&self, name: &str) -> String {
        match self.registry.remove(name).await {
            Ok(()) => {
                let mut current = self.current.write().await;
                if current.as_deref() == Some(name) {
                    *current = None;
                }
                "Done".to_string()
            }
            Err(e) => format!("Error: {e}"),
        }
    }

    pub async fn enable(&self, name: &str) -> String {
        match self.registry.enable(name).await {
            Ok(()) => "Done".to_string(),
            Err(e) => format!("Error: {e}"),
        }
    }

    pub async fn disable(&self, name: &str) -> String {
        match self.registry.disable(name).await {
            Ok(()) => "Done".to_string(),
            Err(e) => format!("Error: {e}"),
        }
    }
}
