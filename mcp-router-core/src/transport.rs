//! Transport factory: produce a bidirectional JSON-RPC stream to a
//! downstream MCP server for one of three transport kinds.
//!
//! A `McpTransportConn` trait with one struct per transport kind, opened
//! through a caller-supplied connect deadline. Stdio drains the child's
//! stderr on a background task with a noise filter, rather than inheriting
//! it directly.

use std::collections::HashMap;
use std::process::Stdio as StdStdio;
use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config_model::Transport as TransportKind;
use crate::error::RouterError;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Substrings that identify known-benign non-JSON noise on a child's
/// stderr (misbehaving children that print banners or parser warnings
/// there). These are demoted to DEBUG rather than dropped silently.
const BENIGN_NOISE_SUBSTRINGS: &[&str] = &[
    "Failed to parse JSONRPC message",
    "Server running on stdio",
    "MCP server started",
];

#[async_trait]
pub trait McpTransportConn: Send + Sync {
    async fn send_and_recv(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, RouterError>;
    async fn close(&mut self) -> Result<(), RouterError>;
}

pub struct StdioTransport {
    child: Child,
    stdin: tokio::process::ChildStdin,
    stdout_lines: tokio::io::Lines<BufReader<tokio::process::ChildStdout>>,
}

impl StdioTransport {
    pub async fn connect(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        deadline: Duration,
    ) -> Result<Self, RouterError> {
        let spawn = async {
            let mut cmd = Command::new(command);
            cmd.args(args)
                .envs(env)
                .stdin(StdStdio::piped())
                .stdout(StdStdio::piped())
                .stderr(StdStdio::piped())
                .kill_on_drop(true);

            let mut child = cmd
                .spawn()
                .map_err(|e| RouterError::Configuration(format!("spawn-failed: {e}")))?;

            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| RouterError::Configuration("no stdin on child process".into()))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| RouterError::Configuration("no stdout on child process".into()))?;
            let stderr = child
                .stderr
                .take()
                .ok_or_else(|| RouterError::Configuration("no stderr on child process".into()))?;

            spawn_stderr_drain(stderr);

            let stdout_lines = BufReader::new(stdout).lines();
            Ok::<_, RouterError>(Self {
                child,
                stdin,
                stdout_lines,
            })
        };

        timeout(deadline, spawn)
            .await
            .map_err(|_| RouterError::Timeout(deadline.as_secs_f64()))?
    }

    async fn send_raw(&mut self, line: &str) -> Result<(), RouterError> {
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| RouterError::Transport(format!("write failed: {e}")))?;
        self.stdin
            .write_all(b"\n")
            .await
            .map_err(|e| RouterError::Transport(format!("write failed: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| RouterError::Transport(format!("flush failed: {e}")))?;
        Ok(())
    }

    async fn recv_raw(&mut self) -> Result<String, RouterError> {
        let line = self
            .stdout_lines
            .next_line()
            .await
            .map_err(|e| RouterError::Transport(format!("read failed: {e}")))?
            .ok_or_else(|| RouterError::Transport("child closed stdout".into()))?;
        if line.len() > MAX_LINE_BYTES {
            return Err(RouterError::Transport(format!(
                "response too large: {} bytes",
                line.len()
            )));
        }
        Ok(line)
    }
}

fn spawn_stderr_drain(stderr: tokio::process::ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if BENIGN_NOISE_SUBSTRINGS.iter().any(|s| line.contains(s)) {
                        debug!(target: "mcp_router_core::child_stderr", %line, "suppressed known-benign child stderr line");
                    } else {
                        warn!(target: "mcp_router_core::child_stderr", %line, "child stderr");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(target: "mcp_router_core::child_stderr", error = %e, "stderr drain error");
                    break;
                }
            }
        }
    });
}

#[async_trait]
impl McpTransportConn for StdioTransport {
    async fn send_and_recv(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, RouterError> {
        let line = serde_json::to_string(request)
            .map_err(|e| RouterError::Internal(format!("failed to serialise request: {e}")))?;
        self.send_raw(&line).await?;
        let resp_line = self.recv_raw().await?;
        serde_json::from_str(&resp_line)
            .map_err(|e| RouterError::Transport(format!("invalid JSON-RPC response: {e}")))
    }

    async fn close(&mut self) -> Result<(), RouterError> {
        let _ = self.stdin.shutdown().await;
        let _ = self.child.start_kill();
        Ok(())
    }
}

pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(url: &str) -> Result<Self, RouterError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RouterError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl McpTransportConn for HttpTransport {
    async fn send_and_recv(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, RouterError> {
        let resp = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| RouterError::Transport(format!("HTTP request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(RouterError::Transport(format!(
                "MCP server returned HTTP {}",
                resp.status()
            )));
        }

        resp.json::<JsonRpcResponse>()
            .await
            .map_err(|e| RouterError::Transport(format!("invalid JSON-RPC response: {e}")))
    }

    async fn close(&mut self) -> Result<(), RouterError> {
        Ok(())
    }
}

/// SSE transport: client→server over a POST to `/messages`, server→client
/// over the `/sse` event stream. Session state lives in router
/// memory, not cookies.
pub struct SseTransport {
    base_url: String,
    client: reqwest::Client,
}

impl SseTransport {
    pub fn new(base_url: &str) -> Result<Self, RouterError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RouterError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl McpTransportConn for SseTransport {
    async fn send_and_recv(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, RouterError> {
        let post_url = format!("{}/messages", self.base_url);
        self.client
            .post(&post_url)
            .json(request)
            .send()
            .await
            .map_err(|e| RouterError::Transport(format!("SSE POST failed: {e}")))?;

        let sse_url = format!("{}/sse", self.base_url);
        let resp = self
            .client
            .get(&sse_url)
            .send()
            .await
            .map_err(|e| RouterError::Transport(format!("SSE GET failed: {e}")))?;

        let mut stream = resp.bytes_stream().eventsource();
        while let Some(event) = stream.next().await {
            let event = event.map_err(|e| RouterError::Transport(format!("SSE stream error: {e}")))?;
            if let Ok(parsed) = serde_json::from_str::<JsonRpcResponse>(&event.data) {
                return Ok(parsed);
            }
        }
        Err(RouterError::Transport("SSE stream closed before a response arrived".into()))
    }

    async fn close(&mut self) -> Result<(), RouterError> {
        Ok(())
    }
}

pub async fn open(
    transport: TransportKind,
    command: &str,
    args: &[String],
    env: &HashMap<String, String>,
    deadline: Duration,
) -> Result<Box<dyn McpTransportConn>, RouterError> {
    match transport {
        TransportKind::Stdio => Ok(Box::new(
            StdioTransport::connect(command, args, env, deadline).await?,
        )),
        TransportKind::Http => Ok(Box::new(HttpTransport::new(command)?)),
        TransportKind::Sse => Ok(Box::new(SseTransport::new(command)?)),
    }
}
