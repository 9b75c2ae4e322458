//! `WebSocket` connection handler for viewers.
//!
//! On connect a viewer becomes a [`Session`]: it is registered, gets a
//! writer task that owns the socket's sending half, and receives one full
//! state frame straight away. The handler then reads inbound messages
//! until the stream fails or closes; that read failure is the only
//! disconnect detection. Exactly `restart` as a text message restarts the
//! simulation, everything else is ignored.

use std::fmt;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use firefly_core::shared::RestartTrigger;
use firefly_types::SessionId;
use futures::stream::SplitStream;
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::registry::{Frame, Session, SessionRegistry};
use crate::state::AppState;

/// Commands a viewer may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    /// Replace the grid with a freshly randomised one.
    Restart,
}

impl ViewerCommand {
    /// Interpret a text message. Only exact matches count.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "restart" => Some(Self::Restart),
            _ => None,
        }
    }
}

/// Upgrade an HTTP request to a viewer `WebSocket`.
///
/// # Route
///
/// `GET /ws` (configurable)
pub async fn ws_viewer(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_failed_upgrade(|e| warn!("WebSocket upgrade failed: {e}"))
        .on_upgrade(|socket| handle_viewer(socket, state))
}

/// Run one viewer session from registration to removal.
async fn handle_viewer(socket: WebSocket, state: Arc<AppState>) {
    let (sink, stream) = socket.split();
    let (session, outbox) = Session::new(state.session_queue_capacity);
    let id = session.id();

    let sessions = state.registry.add(session.clone()).await;
    info!(session_id = %id, sessions, "Viewer connected");

    tokio::spawn(write_frames(sink, outbox, Arc::clone(&state.registry), id));
    state.dispatcher.send_full_state(&session).await;

    read_commands(stream, &state, id).await;

    state.registry.remove(id).await;
    // Dropping the last sender ends the writer, which closes the sink.
    drop(session);
    let sessions = state.registry.len().await;
    info!(session_id = %id, sessions, "Viewer disconnected");
}

/// Read inbound messages until the stream ends or fails.
async fn read_commands(mut stream: SplitStream<WebSocket>, state: &AppState, id: SessionId) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match ViewerCommand::parse(text.as_str()) {
                Some(ViewerCommand::Restart) => {
                    info!(session_id = %id, "Restart requested by viewer");
                    state.grid.restart(RestartTrigger::Command).await;
                }
                None => debug!(session_id = %id, "Ignoring unrecognised message"),
            },
            Ok(Message::Close(_)) => {
                debug!(session_id = %id, "Viewer sent close frame");
                return;
            }
            Ok(_) => {
                // Ping is answered by the socket itself; pong and binary
                // carry nothing for us.
            }
            Err(e) => {
                debug!(session_id = %id, "WebSocket read error: {e}");
                return;
            }
        }
    }
}

/// Drain a session's queue into its socket.
///
/// A failed write unregisters the session. When every sender is gone the
/// queue closes and the sink is closed.
async fn write_frames<S>(
    mut sink: S,
    mut outbox: mpsc::Receiver<Frame>,
    registry: Arc<SessionRegistry>,
    id: SessionId,
) where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    while let Some(frame) = outbox.recv().await {
        if let Err(e) = sink.send(Message::Text(frame)).await {
            debug!(session_id = %id, "WebSocket write failed: {e}");
            registry.remove(id).await;
            return;
        }
    }
    if let Err(e) = sink.close().await {
        debug!(session_id = %id, "WebSocket close failed: {e}");
    }
}
