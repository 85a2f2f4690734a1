//! Streamable HTTP transport for the server façade.
//!
//! Two routes: `GET /health` for liveness, `POST /mcp` for JSON-RPC. Unlike
//! stdio and SSE, this endpoint enforces the session-not-initialized guard
//! (`-32002`) until the client completes `initialize`, since a fresh HTTP
//! connection carries no handshake state of its own.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router as AxumRouter;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::ServerFacade;
use crate::protocol::JsonRpcRequest;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "mcp-router"}))
}

async fn mcp_handler(
    State(facade): State<Arc<ServerFacade>>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<serde_json::Value> {
    match facade.dispatch(&request, true).await {
        Some(response) => Json(serde_json::to_value(response).unwrap_or(serde_json::Value::Null)),
        None => Json(serde_json::Value::Null),
    }
}

pub fn router(facade: Arc<ServerFacade>) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health))
        .route("/mcp", post(mcp_handler))
        .layer(CorsLayer::permissive())
        .with_state(facade)
}

pub async fn run(facade: Arc<ServerFacade>, bind_addr: &str) -> std::io::Result<()> {
    info!(bind_addr, "MCP router starting (streamable HTTP mode)");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, router(facade).into_make_service())
        .await
        .map_err(std::io::Error::other)
}
