//! Server-sent-events HTTP transport.
//!
//! `GET /sse` opens a session and streams responses; the first event
//! tells the client where to POST. `POST /messages?sessionId=…` submits
//! one JSON-RPC request. `GET /health` is a liveness probe.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use engram_engine::MemoryEngine;

use crate::rpc;

/// One live SSE session: the sender side of its event stream.
type SessionMap = DashMap<String, tokio::sync::mpsc::Sender<String>>;

#[derive(Clone)]
struct AppState {
    engine: Arc<MemoryEngine>,
    sessions: Arc<SessionMap>,
}

pub async fn serve(engine: Arc<MemoryEngine>, port: u16) -> anyhow::Result<()> {
    let state = AppState {
        engine,
        sessions: Arc::new(DashMap::new()),
    };
    let app = Router::new()
        .route("/sse", get(open_session))
        .route("/messages", post(post_message))
        .route("/health", get(health))
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(%addr, "sse transport listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn open_session(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = ulid::Ulid::new().to_string();
    let (tx, rx) = tokio::sync::mpsc::channel::<String>(32);
    state.sessions.insert(session_id.clone(), tx);
    tracing::info!(session_id, "sse session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={session_id}"));
    let responses = ReceiverStream::new(rx).map(|payload| Event::default().event("message").data(payload));
    let stream = tokio_stream::once(endpoint)
        .chain(responses)
        .map(Ok::<Event, Infallible>);

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> impl IntoResponse {
    let Some(sender) = state
        .sessions
        .get(&query.session_id)
        .map(|entry| entry.value().clone())
    else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };

    let response = match serde_json::from_str::<rpc::RpcRequest>(&body) {
        Ok(request) => rpc::handle_request(&state.engine, request).await,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable request body");
            Some(rpc::parse_error())
        }
    };
    if let Some(response) = response {
        let payload = match serde_json::to_string(&response) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "response serialization failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };
        if sender.send(payload).await.is_err() {
            // Client went away; drop the session.
            state.sessions.remove(&query.session_id);
            return (StatusCode::GONE, "session closed").into_response();
        }
    }
    StatusCode::ACCEPTED.into_response()
}
