//! WebSocket handler: per-connection relay between a socket and its room.
//!
//! DESIGN
//! ======
//! The socket task owns no room state. Inbound text frames are forwarded
//! unparsed to the room actor, which classifies and routes them; outbound
//! payloads arrive pre-serialized on the session channel and are written to
//! the socket as-is.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → register with the room (`Connect`); the welcome snapshot is
//!    already queued on the session channel when registration returns
//! 2. `select!` loop: socket text → room, session channel → socket
//! 3. Close, socket error, or room shutdown → `Disconnect` → task exits

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::room::RoomCommand;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, Path(room): Path<String>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state, room))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, room: String) {
    let connection_id = Uuid::new_v4();
    let (client_tx, mut client_rx) = mpsc::channel::<String>(state.config.room.session_channel_capacity);

    if let Err(e) = state
        .request(&room, |ack| RoomCommand::Connect { connection_id, tx: client_tx.clone(), ack })
        .await
    {
        warn!(%room, %connection_id, error = %e, "ws: room rejected connection");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    // The room holds the only sender from here on, so the channel closing
    // means the room is gone.
    drop(client_tx);

    // A registered session keeps the room alive, so this handle stays valid.
    let handle = state.room(&room).await;
    info!(%room, %connection_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let command = RoomCommand::Inbound { connection_id, text: text.to_string() };
                        if handle.send(command).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            outbound = client_rx.recv() => {
                let Some(text) = outbound else { break };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = handle.send(RoomCommand::Disconnect { connection_id }).await;
    info!(%room, %connection_id, "ws: client disconnected");
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
