//! Instance registry: the live map of configured MCP instances to
//! their client sessions.
//!
//! Lookups take a `RwLock<HashMap<...>>` read guard just long enough to
//! clone the shared session handle, then release it before any session
//! I/O — a slow downstream call never blocks other instances' lookups.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config_model::Instance;
use crate::config_store::ConfigStore;
use crate::error::RouterError;
use crate::protocol::ToolDescriptor;
use crate::session::{ClientSession, SharedSession};

pub struct InstanceRegistry {
    store: ConfigStore,
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl InstanceRegistry {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Load every instance from disk and connect concurrently. A failed
    /// connect is logged and the instance is kept in the registry as
    /// disconnected rather than dropped: it still shows up in
    /// `mcp.router.list` and can be retried via `add`/process restart.
    pub async fn load_and_connect_all(&self) -> Result<(), RouterError> {
        let instances = self.store.load_all()?;
        let mut handles = Vec::with_capacity(instances.len());
        for instance in instances {
            let name = instance.name.clone();
            let session = Arc::new(ClientSession::new(instance));
            handles.push(async move {
                if session.instance.is_active {
                    if let Err(e) = session.connect().await {
                        warn!(instance = %name, error = %e, "failed to connect instance at startup");
                    }
                }
                (name, session)
            });
        }
        let connected = futures_util::future::join_all(handles).await;

        let mut sessions = self.sessions.write().await;
        for (name, session) in connected {
            sessions.insert(name, session);
        }
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<SharedSession, RouterError> {
        self.sessions
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| RouterError::instance_not_found(name))
    }

    pub async fn list(&self) -> Vec<SharedSession> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub async fn names(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn all_tools(&self) -> HashMap<String, Vec<ToolDescriptor>> {
        let sessions: Vec<_> = self.sessions.read().await.values().cloned().collect();
        let mut out = HashMap::with_capacity(sessions.len());
        for session in sessions {
            out.insert(session.instance.name.clone(), session.list_tools().await);
        }
        out
    }

    /// Register and connect a new instance, persisting it to
    /// `mcp_settings.json` first so a crash mid-connect doesn't lose the
    /// definition.
    pub async fn add(&self, instance: Instance) -> Result<(), RouterError> {
        instance.validate()?;
        {
            let sessions = self.sessions.read().await;
            if sessions.contains_key(&instance.name) {
                return Err(RouterError::Validation(format!(
                    "Instance '{}' already exists",
                    instance.name
                )));
            }
        }

        self.store.save_instance(&instance)?;

        let session = Arc::new(ClientSession::new(instance));
        if session.instance.is_active {
            session.connect().await?;
        }
        let name = session.instance.name.clone();
        self.sessions.write().await.insert(name.clone(), session);
        info!(instance = %name, "instance added");
        Ok(())
    }

    pub async fn remove(&self, name: &str) -> Result<(), RouterError> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(name)
                .ok_or_else(|| RouterError::instance_not_found(name))?
        };
        session.disconnect().await?;
        self.store.remove_instance(&session.instance)?;
        info!(instance = %name, "instance removed");
        Ok(())
    }

    /// Disable: per the Open Question decision, this does not force an
    /// eager disconnect. The session is marked and will decline new
    /// `tools/call`s through the router layer; its transport stays open
    /// until the next restart or explicit `remove`.
    pub async fn disable(&self, name: &str) -> Result<(), RouterError> {
        let session = self.get(name).await?;
        self.store.set_active(name, false)?;
        session.set_active(false);
        info!(instance = %name, "instance disabled");
        Ok(())
    }

    pub async fn enable(&self, name: &str) -> Result<(), RouterError> {
        let session = self.get(name).await?;
        self.store.set_active(name, true)?;
        session.set_active(true);
        if !session.is_connected().await {
            session.connect().await?;
        }
        info!(instance = %name, "instance enabled");
        Ok(())
    }
}
