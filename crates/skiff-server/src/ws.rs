//! Duplex session channel over WebSocket
//!
//! One `Channel` per connection: its own session (transcript, action log,
//! browser-state cache), its own event queue, its own in-flight flag.
//! Events are forwarded to the socket in exactly the order the agent
//! produces them. Closing the socket stops delivery but does not cancel
//! an in-flight turn; the turn finishes or times out on its own terms.

use crate::server::SharedState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use skiff_agent::EventSink;
use skiff_core::{ClientMessage, Session, SkiffError, UiEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Decision for one inbound text frame, made before anything touches the
/// session
#[derive(Debug, PartialEq, Eq)]
enum Dispatch {
    /// Well-formed utterance on an idle channel: run a turn
    Run(String),
    /// Payload did not parse; the transcript stays untouched
    Malformed,
    /// A turn is already in flight on this channel
    Busy,
}

/// Triage an inbound frame against the channel's in-flight flag
///
/// Claims the flag as a side effect when the frame is accepted, so the
/// decision and the claim are one atomic step.
fn dispatch_inbound(text: &str, in_flight: &AtomicBool) -> Dispatch {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            let err = SkiffError::Protocol(e.to_string());
            warn!("Rejected inbound frame: {}", err);
            return Dispatch::Malformed;
        }
    };

    if in_flight.swap(true, Ordering::SeqCst) {
        warn!("Turn already in flight on this channel, rejecting utterance");
        return Dispatch::Busy;
    }

    Dispatch::Run(message.content)
}

/// GET /ws - upgrade to the duplex channel
pub async fn ws_handler(
    State(app): State<SharedState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

async fn handle_socket(socket: WebSocket, app: SharedState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<UiEvent>();
    let sink = EventSink::new(event_tx);

    app.ws_clients.fetch_add(1, Ordering::SeqCst);
    info!("Client connected via WebSocket");

    // Writer half: serialize events in production order, no batching
    let writer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    sink.emit(UiEvent::connect());

    let session = Arc::new(Mutex::new(Session::new()));
    let in_flight = Arc::new(AtomicBool::new(false));

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                // Extra utterances on a busy channel are rejected, matching
                // the UI's disabled-input convention
                let content = match dispatch_inbound(&text, &in_flight) {
                    Dispatch::Run(content) => content,
                    Dispatch::Malformed | Dispatch::Busy => continue,
                };

                let app = app.clone();
                let sink = sink.clone();
                let session = session.clone();
                let in_flight = in_flight.clone();
                tokio::spawn(async move {
                    // Global serialization: the browser is a single-owner
                    // resource, so turns queue process-wide
                    let _turn = app.turn_lock.lock().await;
                    let mut session = session.lock().await;
                    app.agent
                        .handle_turn(&mut session, &sink, &content)
                        .await;
                    drop(session);
                    in_flight.store(false, Ordering::SeqCst);
                });
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "WebSocket closed by client");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
        }
    }

    app.ws_clients.fetch_sub(1, Ordering::SeqCst);
    writer.abort();
    info!("Client disconnected from WebSocket");
}
