//! Client session: one live connection to a downstream MCP server.
//!
//! Holds the connection state, the cached tool list from the last
//! `tools/list`, and an independent active/disabled flag so a disabled
//! instance can keep its transport open while declining new calls.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config_model::Instance;
use crate::error::RouterError;
use crate::protocol::{CallToolResult, ContentPart, JsonRpcRequest, PROTOCOL_VERSION, ToolDescriptor};
use crate::transport::{self, McpTransportConn};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

struct SessionInner {
    transport: Option<Box<dyn McpTransportConn>>,
    state: SessionState,
    tools: Vec<ToolDescriptor>,
    next_id: AtomicI64,
}

/// A single session against one [`Instance`]. All round-trips through a
/// session are serialised by an exclusive lock: the router never
/// issues two concurrent `tools/call`s to the same child.
pub struct ClientSession {
    pub instance: Instance,
    inner: Mutex<SessionInner>,
    /// Mirrors the instance's persisted `isActive` flag. Tracked
    /// separately from `Instance` (which the session owns by value) so
    /// `enable`/`disable` can flip it without re-reading the instance
    /// from disk; disabling an instance does not force a disconnect.
    active: AtomicBool,
}

impl ClientSession {
    pub fn new(instance: Instance) -> Self {
        let active = instance.is_active;
        Self {
            instance,
            inner: Mutex::new(SessionInner {
                transport: None,
                state: SessionState::Disconnected,
                tools: Vec::new(),
                next_id: AtomicI64::new(1),
            }),
            active: AtomicBool::new(active),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    pub async fn is_connected(&self) -> bool {
        matches!(self.inner.lock().await.state, SessionState::Connected)
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Open the transport, perform the `initialize` handshake, send
    /// `notifications/initialized`, then populate the tool catalogue via
    /// `tools/list`. On any failure the session returns to
    /// `Disconnected` so a later `connect` can retry cleanly.
    pub async fn connect(&self) -> Result<(), RouterError> {
        let mut guard = self.inner.lock().await;
        guard.state = SessionState::Connecting;

        let result = self.do_connect(&mut guard).await;
        match result {
            Ok(()) => {
                guard.state = SessionState::Connected;
                info!(instance = %self.instance.name, tools = guard.tools.len(), "instance connected");
                Ok(())
            }
            Err(e) => {
                guard.transport = None;
                guard.state = SessionState::Disconnected;
                warn!(instance = %self.instance.name, error = %e, "connect failed");
                Err(e)
            }
        }
    }

    async fn do_connect(&self, guard: &mut SessionInner) -> Result<(), RouterError> {
        let mut conn = transport::open(
            self.instance.transport,
            &self.instance.command,
            &self.instance.args,
            &self.instance.env,
            HANDSHAKE_TIMEOUT,
        )
        .await?;

        let init_req = JsonRpcRequest::new(
            json!(guard.next_id.fetch_add(1, Ordering::Relaxed)),
            "initialize",
            Some(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": { "name": "mcp-router", "version": env!("CARGO_PKG_VERSION") },
            })),
        );
        let init_resp = timeout(HANDSHAKE_TIMEOUT, conn.send_and_recv(&init_req))
            .await
            .map_err(|_| RouterError::Timeout(HANDSHAKE_TIMEOUT.as_secs_f64()))??;
        if let Some(err) = init_resp.error {
            return Err(RouterError::Transport(format!(
                "initialize rejected: {} ({})",
                err.message, err.code
            )));
        }

        let initialized = JsonRpcRequest::notification("notifications/initialized", Some(json!({})));
        let _ = conn.send_and_recv(&initialized).await;

        let list_req = JsonRpcRequest::new(
            json!(guard.next_id.fetch_add(1, Ordering::Relaxed)),
            "tools/list",
            Some(json!({})),
        );
        let list_resp = timeout(HANDSHAKE_TIMEOUT, conn.send_and_recv(&list_req))
            .await
            .map_err(|_| RouterError::Timeout(HANDSHAKE_TIMEOUT.as_secs_f64()))??;
        let tools = match list_resp.error {
            Some(err) => {
                return Err(RouterError::Transport(format!(
                    "tools/list failed: {} ({})",
                    err.message, err.code
                )));
            }
            None => {
                let result = list_resp.result.unwrap_or(Value::Null);
                let raw_tools = result.get("tools").cloned().unwrap_or(Value::Array(vec![]));
                serde_json::from_value::<Vec<ToolDescriptor>>(raw_tools)
                    .map_err(|e| RouterError::Transport(format!("invalid tools/list payload: {e}")))?
            }
        };

        guard.tools = tools;
        guard.transport = Some(conn);
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<(), RouterError> {
        let mut guard = self.inner.lock().await;
        guard.state = SessionState::Closing;
        if let Some(mut conn) = guard.transport.take() {
            let _ = conn.close().await;
        }
        guard.tools.clear();
        guard.state = SessionState::Disconnected;
        Ok(())
    }

    pub async fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.inner.lock().await.tools.clone()
    }

    pub async fn has_tool(&self, name: &str) -> bool {
        self.inner.lock().await.tools.iter().any(|t| t.name == name)
    }

    /// Call `tool` with `arguments` and wait up to `call_timeout`. Mirrors
    /// the downstream server's own error response maps to a tool result
    /// disconnected → `InstanceNotFound`-shaped transport error, unknown
    /// tool → `ToolNotFound`, expiry → `Timeout`, wire error → `Transport`.
    pub async fn call(
        &self,
        tool: &str,
        arguments: Value,
        call_timeout: Option<Duration>,
    ) -> Result<CallToolResult, RouterError> {
        if !self.is_active() {
            return Err(RouterError::Configuration(format!(
                "instance '{}' is disabled",
                self.instance.name
            )));
        }
        let mut guard = self.inner.lock().await;
        if guard.state != SessionState::Connected {
            return Err(RouterError::Configuration(format!(
                "instance '{}' is not connected",
                self.instance.name
            )));
        }
        if !guard.tools.iter().any(|t| t.name == tool) {
            return Err(RouterError::tool_not_found(tool, self.instance.name.clone()));
        }

        let id = guard.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(
            json!(id),
            "tools/call",
            Some(json!({ "name": tool, "arguments": arguments })),
        );

        let conn = guard
            .transport
            .as_mut()
            .ok_or_else(|| RouterError::Transport(format!("instance '{}' has no live transport", self.instance.name)))?;

        let call_timeout = call_timeout.unwrap_or(DEFAULT_CALL_TIMEOUT);
        let resp = timeout(call_timeout, conn.send_and_recv(&req))
            .await
            .map_err(|_| RouterError::Timeout(call_timeout.as_secs_f64()))??;

        if let Some(err) = resp.error {
            return Err(RouterError::Transport(format!("{} ({})", err.message, err.code)));
        }

        let result = resp.result.unwrap_or(Value::Null);
        match serde_json::from_value::<CallToolResult>(result.clone()) {
            Ok(parsed) => Ok(parsed),
            Err(_) => Ok(CallToolResult {
                content: vec![ContentPart::Text { text: result.to_string() }],
                is_error: false,
            }),
        }
    }

    /// Snapshot for `mcp.router.list` / admin status endpoints.
    pub async fn describe(&self) -> Value {
        let guard = self.inner.lock().await;
        json!({
            "name": self.instance.name,
            "provider": self.instance.provider,
            "active": self.is_active(),
            "connected": guard.state == SessionState::Connected,
            "transport": self.instance.transport.as_str(),
            "tools_count": guard.tools.len(),
            "metadata": self.instance.metadata,
        })
    }
}

pub type SharedSession = Arc<ClientSession>;
