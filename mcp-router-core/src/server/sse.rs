//! SSE transport for the server façade: `GET /sse` for the event stream,
//! `POST /messages` for client-to-server requests.
//!
//! A request posted to `/messages` is dispatched and its response pushed
//! onto a `tokio::sync::broadcast` channel; every open `/sse` stream
//! receives it asynchronously rather than as a direct reply to the POST.

use std::convert::Infallible;
use std::sync::Arc;

use axum::Router as AxumRouter;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use futures_util::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::ServerFacade;
use crate::protocol::JsonRpcRequest;

#[derive(Clone)]
struct SseState {
    facade: Arc<ServerFacade>,
    responses: broadcast::Sender<String>,
}

async fn sse_stream(State(state): State<SseState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.responses.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| msg.ok().map(|body| Ok(Event::default().data(body))));
    Sse::new(stream)
}

async fn post_message(State(state): State<SseState>, Json(request): Json<JsonRpcRequest>) -> impl IntoResponse {
    if let Some(response) = state.facade.dispatch(&request, false).await {
        if let Ok(body) = serde_json::to_string(&response) {
            let _ = state.responses.send(body);
        }
    }
    axum::http::StatusCode::ACCEPTED
}

pub fn router(facade: Arc<ServerFacade>) -> AxumRouter {
    let (tx, _rx) = broadcast::channel(256);
    let state = SseState { facade, responses: tx };
    AxumRouter::new()
        .route("/sse", get(sse_stream))
        .route("/messages", post(post_message))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(facade: Arc<ServerFacade>, bind_addr: &str) -> std::io::Result<()> {
    info!(bind_addr, "MCP router starting (SSE mode)");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, router(facade).into_make_service())
        .await
        .map_err(std::io::Error::other)
}
