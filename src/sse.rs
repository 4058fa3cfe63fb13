//! Legacy HTTP+SSE transport.
//!
//! `GET /sse` opens an event stream whose first event (`endpoint`) names the
//! URL the client posts JSON-RPC messages to. Each session runs its own
//! [`GsheetServer`] over an in-memory pipe: posted messages are written into
//! the pipe and every line the server writes back is forwarded as a
//! `message` event.

use crate::server::GsheetServer;
use crate::state::AppState;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
};
use futures::{Stream, StreamExt, stream};
use parking_lot::RwLock;
use rmcp::ServiceExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, WriteHalf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const SSE_PATH: &str = "/sse";
pub const MESSAGE_PATH: &str = "/messages/";

const PIPE_CAPACITY: usize = 64 * 1024;

type SessionWriter = Arc<Mutex<WriteHalf<DuplexStream>>>;
type SessionMap = Arc<RwLock<HashMap<String, SessionWriter>>>;

#[derive(Clone)]
struct SseState {
    app: Arc<AppState>,
    sessions: SessionMap,
    shutdown: CancellationToken,
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: String,
}

/// Routes for `/sse` and `/messages/`. Streams end when `shutdown` fires.
pub fn router(app: Arc<AppState>, shutdown: CancellationToken) -> Router {
    let state = SseState {
        app,
        sessions: Arc::default(),
        shutdown,
    };
    Router::new()
        .route(SSE_PATH, get(open_stream))
        .route(MESSAGE_PATH, post(post_message))
        .with_state(state)
}

/// Removes the session when its event stream is dropped, which closes the
/// server's input and ends the session task.
struct SessionGuard {
    id: String,
    sessions: SessionMap,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.sessions.write().remove(&self.id).is_some() {
            tracing::info!(session_id = %self.id, "sse session closed");
        }
    }
}

async fn open_stream(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().simple().to_string();
    let (client_io, server_io) = tokio::io::duplex(PIPE_CAPACITY);
    let (client_read, client_write) = tokio::io::split(client_io);
    state
        .sessions
        .write()
        .insert(session_id.clone(), Arc::new(Mutex::new(client_write)));
    tracing::info!(session_id = %session_id, "sse session opened");

    let server = GsheetServer::from_state(state.app.clone());
    let session_token = state.shutdown.child_token();
    let task_session_id = session_id.clone();
    tokio::spawn(async move {
        match server.serve_with_ct(server_io, session_token).await {
            Ok(service) => {
                if let Err(error) = service.waiting().await {
                    tracing::warn!(session_id = %task_session_id, ?error, "sse session task failed");
                }
            }
            Err(error) => {
                tracing::warn!(session_id = %task_session_id, ?error, "sse session failed to initialize");
            }
        }
    });

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{MESSAGE_PATH}?session_id={session_id}"));
    let guard = SessionGuard {
        id: session_id,
        sessions: state.sessions.clone(),
    };
    let lines = BufReader::new(client_read).lines();
    let messages = stream::unfold((lines, guard), |(mut lines, guard)| async move {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let event = Event::default().event("message").data(line);
                Some((Ok(event), (lines, guard)))
            }
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(session_id = %guard.id, ?error, "sse session pipe failed");
                None
            }
        }
    });

    let events = stream::once(async move { Ok::<_, Infallible>(endpoint) })
        .chain(messages)
        .take_until(state.shutdown.clone().cancelled_owned());
    Sse::new(events).keep_alive(KeepAlive::default())
}

async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> StatusCode {
    let writer = state.sessions.read().get(&query.session_id).cloned();
    let Some(writer) = writer else {
        tracing::debug!(session_id = %query.session_id, "message for unknown sse session");
        return StatusCode::NOT_FOUND;
    };

    // Re-encode so the frame is guaranteed to fit on one line.
    let message: serde_json::Value = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(error) => {
            tracing::debug!(session_id = %query.session_id, %error, "rejected malformed message");
            return StatusCode::BAD_REQUEST;
        }
    };
    let mut frame = message.to_string();
    frame.push('\n');

    let mut writer = writer.lock().await;
    let written = match writer.write_all(frame.as_bytes()).await {
        Ok(()) => writer.flush().await,
        Err(error) => Err(error),
    };
    match written {
        Ok(()) => StatusCode::ACCEPTED,
        Err(error) => {
            tracing::warn!(session_id = %query.session_id, ?error, "sse session is gone");
            StatusCode::GONE
        }
    }
}
