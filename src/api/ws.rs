//! WebSocket subscription endpoint.
//!
//! Each connection gets its own unbounded channel registered with the hub;
//! this task forwards hub frames to the socket and drains inbound frames
//! until the peer closes or a write fails, then unregisters.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::AppState;
use crate::broadcast::BroadcastHub;

/// `GET /ws/notes` — upgrade and stream note events until the peer leaves.
pub async fn subscribe_notes(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| stream_events(hub, socket))
}

async fn stream_events(hub: Arc<BroadcastHub>, socket: WebSocket) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let id = hub.register(tx).await;

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Some(text) => {
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        debug!(subscriber = %id, "send failed, closing subscription");
                        break;
                    }
                }
                None => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Inbound frames carry nothing we act on; drain them.
                Some(Ok(_)) => {}
            },
        }
    }

    hub.unregister(&id).await;
}
