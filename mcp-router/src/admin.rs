//! HTTP admin surface and bearer-token security layer.
//!
//! Responses use a structured `{"status", "instance_name", "message"}`
//! JSON vocabulary, kept deliberately separate from the MCP tool layer's
//! plain `"Done"`/`"Error: ..."` strings. The bearer-token check is a
//! constant-shape string compare against the configured token.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post};
use axum::Router as AxumRouter;
use axum::extract::Request;
use mcp_router_core::config_model::Instance;
use mcp_router_core::router::Router;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AdminState {
    pub router: Arc<Router>,
    pub bearer_token: Option<String>,
}

/// Plain string compare, not constant-time: the token is a local operator
/// secret, not a cross-tenant credential.
fn validate_bearer_token(expected: &str, header: &HeaderMap) -> bool {
    header
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| token == expected)
        .unwrap_or(false)
}

async fn auth_middleware(State(state): State<AdminState>, headers: HeaderMap, request: Request, next: Next) -> axum::response::Response {
    match &state.bearer_token {
        Some(expected) if !validate_bearer_token(expected, &headers) => {
            (StatusCode::UNAUTHORIZED, Json(json!({"status": "error", "message": "invalid or missing bearer token"}))).into_response()
        }
        _ => next.run(request).await,
    }
}

async fn list_instances(State(state): State<AdminState>) -> Json<Value> {
    Json(json!({"status": "ok", "instances": state.router.list().await}))
}

#[derive(Deserialize)]
struct AddInstanceBody {
    config: Value,
}

async fn add_instance(State(state): State<AdminState>, Json(body): Json<AddInstanceBody>) -> impl IntoResponse {
    let instance = match Instance::from_raw_json(&body.config, None) {
        Ok(i) => i,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(json!({"status": "error", "message": e.to_string()}))),
    };
    let name = instance.name.clone();
    let message = state.router.add(instance).await;
    let status = if message == "Done" { StatusCode::CREATED } else { StatusCode::BAD_REQUEST };
    (status, Json(json!({"status": status_word(&message), "instance_name": name, "message": message})))
}

async fn remove_instance(State(state): State<AdminState>, Path(name): Path<String>) -> Json<Value> {
    let message = state.router.remove(&name).await;
    Json(json!({"status": status_word(&message), "instance_name": name, "message": message}))
}

async fn enable_instance(State(state): State<AdminState>, Path(name): Path<String>) -> Json<Value> {
    let message = state.router.enable(&name).await;
    Json(json!({"status": status_word(&message), "instance_name": name, "message": message}))
}

async fn disable_instance(State(state): State<AdminState>, Path(name): Path<String>) -> Json<Value> {
    let message = state.router.disable(&name).await;
    Json(json!({"status": status_word(&message), "instance_name": name, "message": message}))
}

#[derive(Deserialize)]
struct CallToolBody {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

async fn call_instance(State(state): State<AdminState>, Path(name): Path<String>, Json(body): Json<CallToolBody>) -> Json<Value> {
    let result = state.router.call(Some(&name), &body.tool, body.arguments).await;
    let status = if matches!(&result, Value::Object(map) if map.contains_key("code")) { "error" } else { "ok" };
    Json(json!({"status": status, "instance_name": name, "result": result}))
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

fn status_word(message: &str) -> &'static str {
    if message.starts_with("Error:") { "error" } else { "ok" }
}

pub fn router(state: AdminState) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health))
        .route("/instances", get(list_instances).post(add_instance))
        .route("/instances/:name", delete(remove_instance))
        .route("/instances/:name/enable", post(enable_instance))
        .route("/instances/:name/disable", post(disable_instance))
        .route("/instances/:name/call", post(call_instance))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(state: AdminState, bind_addr: &str) -> std::io::Result<()> {
    tracing::info!(bind_addr, "admin API starting");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, router(state).into_make_service())
        .await
        .map_err(std::io::Error::other)
}
