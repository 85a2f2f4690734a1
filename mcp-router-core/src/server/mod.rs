//! Upstream server façade: the `mcp.router.*` meta-tools exposed to
//! whatever MCP host embeds this router, over stdio, SSE or streamable
//! HTTP.
//!
//! One JSON-RPC dispatch table (`initialize`, `notifications/initialized`,
//! `ping`, `tools/list`, `tools/call`, `resources/list`, `prompts/list`,
//! method-not-found) is shared by all three transports; only the HTTP
//! transport enforces the session-not-initialized guard before
//! `initialize` completes.

pub mod http;
pub mod sse;
pub mod stdio;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Value, json};

use crate::error::RouterError;
use crate::protocol::{
    CODE_INTERNAL_ERROR, CODE_INVALID_PARAMS, CODE_METHOD_NOT_FOUND, CODE_SESSION_NOT_INITIALIZED,
    CallToolResult, ContentPart, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION, ToolDescriptor,
};
use crate::registry::InstanceRegistry;
use crate::router::Router;

/// Names of the tools gated by `allow_instance_management`: they mutate
/// the instance set rather than merely reading it.
const MANAGEMENT_TOOLS: &[&str] = &["mcp.router.add", "mcp.router.remove", "mcp.router.enable", "mcp.router.disable"];

pub struct ServerFacade {
    pub server_name: String,
    pub server_version: String,
    pub router: Arc<Router>,
    pub registry: Arc<InstanceRegistry>,
    pub allow_instance_management: bool,
    initialized: AtomicBool,
}

impl ServerFacade {
    pub fn new(
        server_name: impl Into<String>,
        server_version: impl Into<String>,
        router: Arc<Router>,
        registry: Arc<InstanceRegistry>,
        allow_instance_management: bool,
    ) -> Self {
        Self {
            server_name: server_name.into(),
            server_version: server_version.into(),
            router,
            registry,
            allow_instance_management,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn tool_catalogue(&self) -> Vec<ToolDescriptor> {
        let mut tools = vec![
            tool("mcp.router.list", "List every configured MCP instance and its status.", json!({"type": "object", "properties": {}})),
            tool(
                "mcp.router.help",
                "Describe router commands, or the tools of one instance.",
                json!({"type": "object", "properties": {"instance": {"type": "string"}}}),
            ),
            tool(
                "mcp.router.use",
                "Select an instance as the default target for mcp.router.call.",
                json!({"type": "object", "properties": {"instance": {"type": "string"}}, "required": ["instance"]}),
            ),
            tool(
                "mcp.router.call",
                "Call a tool on an instance (or the currently selected one).",
                json!({
                    "type": "object",
                    "properties": {
                        "instance": {"type": "string"},
                        "tool": {"type": "string"},
                        "arguments": {"type": "object"}
                    },
                    "required": ["tool"]
                }),
            ),
        ];
        if self.allow_instance_management {
            tools.push(tool(
                "mcp.router.add",
                "Register a new MCP instance.",
                json!({"type": "object", "properties": {"config": {"type": "object"}}, "required": ["config"]}),
            ));
            tools.push(tool(
                "mcp.router.remove",
                "Remove an MCP instance.",
                json!({"type": "object", "properties": {"instance": {"type": "string"}}, "required": ["instance"]}),
            ));
            tools.push(tool(
                "mcp.router.enable",
                "Enable a disabled MCP instance.",
                json!({"type": "object", "properties": {"instance": {"type": "string"}}, "required": ["instance"]}),
            ));
            tools.push(tool(
                "mcp.router.disable",
                "Disable an MCP instance without removing it.",
                json!({"type": "object", "properties": {"instance": {"type": "string"}}, "required": ["instance"]}),
            ));
        }
        tools
    }

    /// Dispatch one JSON-RPC request to completion. `requires_init_guard`
    /// enables the HTTP transport's `-32002` session-not-initialized check
    /// check; stdio and SSE process requests in arrival order and don't
    /// need it.
    pub async fn dispatch(&self, request: &JsonRpcRequest, requires_init_guard: bool) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            if request.method == "notifications/initialized" {
                self.mark_initialized();
            }
            return None;
        }

        if requires_init_guard && request.method != "initialize" && !self.is_initialized() {
            return Some(JsonRpcResponse::failure(
                request.id.clone(),
                CODE_SESSION_NOT_INITIALIZED,
                "Server not initialized",
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => {
                self.mark_initialized();
                JsonRpcResponse::success(
                    request.id.clone(),
                    json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {"tools": {}},
                        "serverInfo": {"name": self.server_name, "version": self.server_version},
                    }),
                )
            }
            "ping" => JsonRpcResponse::success(request.id.clone(), json!({})),
            "tools/list" => JsonRpcResponse::success(request.id.clone(), json!({"tools": self.tool_catalogue()})),
            "tools/call" => self.handle_tools_call(request).await,
            "resources/list" => JsonRpcResponse::success(request.id.clone(), json!({"resources": []})),
            "prompts/list" => JsonRpcResponse::success(request.id.clone(), json!({"prompts": []})),
            other => JsonRpcResponse::failure(request.id.clone(), CODE_METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };
        Some(response)
    }

    async fn handle_tools_call(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let params = match &request.params {
            Some(p) => p,
            None => return JsonRpcResponse::failure(request.id.clone(), CODE_INVALID_PARAMS, "Invalid params"),
        };
        let name = match params.get("name").and_then(|v| v.as_str()) {
            Some(n) => n,
            None => return JsonRpcResponse::failure(request.id.clone(), CODE_INVALID_PARAMS, "Invalid params"),
        };
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        if MANAGEMENT_TOOLS.contains(&name) && !self.allow_instance_management {
            let err = RouterError::Security(format!("instance management is disabled; cannot call '{name}'"));
            return JsonRpcResponse::success(request.id.clone(), error_result(&err));
        }

        let result = self.call_meta_tool(name, arguments).await;
        match result {
            Ok(call_result) => JsonRpcResponse::success(request.id.clone(), serde_json::to_value(call_result).unwrap_or(Value::Null)),
            Err(e) => {
                JsonRpcResponse::failure(request.id.clone(), CODE_INTERNAL_ERROR, e.to_string())
            }
        }
    }

    async fn call_meta_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, RouterError> {
        let payload: Value = match name {
            "mcp.router.list" => self.router.list().await,
            "mcp.router.help" => {
                let instance = arguments.get("instance").and_then(|v| v.as_str());
                self.router.help(instance).await
            }
            "mcp.router.use" => {
                let instance = str_arg(&arguments, "instance")?;
                json!(self.router.use_instance(instance).await)
            }
            "mcp.router.call" => {
                let instance = arguments.get("instance").and_then(|v| v.as_str());
                let tool = str_arg(&arguments, "tool")?;
                let call_args = arguments.get("arguments").cloned().unwrap_or_else(|| json!({}));
                self.router.call(instance, tool, call_args).await
            }
            "mcp.router.add" => {
                let config = arguments
                    .get("config")
                    .ok_or_else(|| RouterError::Validation("missing 'config'".into()))?;
                let instance = crate::config_model::Instance::from_raw_json(config, None)?;
                json!(self.router.add(instance).await)
            }
            "mcp.router.remove" => {
                let instance = str_arg(&arguments, "instance")?;
                json!(self.router.remove(instance).await)
            }
            "mcp.router.enable" => {
                let instance = str_arg(&arguments, "instance")?;
                json!(self.router.enable(instance).await)
            }
            "mcp.router.disable" => {
                let instance = str_arg(&arguments, "instance")?;
                json!(self.router.disable(instance).await)
            }
            other => return Err(RouterError::tool_not_found(other, "mcp.router")),
        };

        let is_error = match &payload {
            Value::String(s) => s.starts_with("Error:"),
            Value::Object(map) => map.contains_key("code"),
            _ => false,
        };
        let text = serde_json::to_string(&payload).unwrap_or_else(|_| "null".to_string());
        Ok(CallToolResult { content: vec![ContentPart::Text { text }], is_error })
    }
}

fn str_arg<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, RouterError> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RouterError::Validation(format!("missing '{key}'")))
}

fn error_result(err: &RouterError) -> Value {
    json!({"content": [{"type": "text", "text": err.to_json().to_string()}], "isError": true})
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDescriptor {
    ToolDescriptor { name: name.to_string(), description: description.to_string(), input_schema }
}
