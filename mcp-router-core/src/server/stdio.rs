//! Stdio transport for the server façade.
//!
//! Line-buffered stdin/stdout loop: one JSON-RPC request per line, one
//! response per line, flushed immediately. Stdio has no
//! session-not-initialized concept, so every line is dispatched in
//! arrival order without the init guard the HTTP transport needs.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{error, warn};

use super::ServerFacade;
use crate::protocol::{CODE_PARSE_ERROR, JsonRpcRequest, JsonRpcResponse};

pub async fn run(facade: &ServerFacade) -> std::io::Result<()> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::with_capacity(8192, stdin).lines();
    let stdout = tokio::io::stdout();
    let mut stdout = BufWriter::with_capacity(8192, stdout);

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request: Result<JsonRpcRequest, _> = serde_json::from_str(&line);
        let response = match request {
            Ok(req) => facade.dispatch(&req, false).await,
            Err(e) => {
                warn!(error = %e, "failed to parse JSON-RPC line");
                serde_json::from_str::<serde_json::Value>(&line)
                    .ok()
                    .and_then(|v| v.get("id").cloned())
                    .map(|id| JsonRpcResponse::failure(Some(id), CODE_PARSE_ERROR, format!("Parse error: {e}")))
            }
        };

        let Some(response) = response else { continue };
        let body = match serde_json::to_string(&response) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to serialise response");
                continue;
            }
        };
        stdout.write_all(body.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}
