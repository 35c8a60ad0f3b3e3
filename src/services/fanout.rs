//! Broadcast fanout and the per-room session registry.
//!
//! DESIGN
//! ======
//! Each connected websocket owns a bounded mpsc channel; the registry keeps
//! the sending half keyed by connection id. A broadcast serializes the
//! payload once and `try_send`s the same string to every session, so one
//! slow or dead connection never stalls the room.
//!
//! Per-connection ordering is the channel's FIFO order. Nothing is promised
//! about the relative order in which different connections receive a message.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::protocol::Outbound;

/// Sending half of a session's outbound channel. Payloads are pre-serialized
/// JSON text.
pub type SessionSender = mpsc::Sender<String>;

#[derive(Debug, Default)]
pub struct Sessions {
    senders: HashMap<Uuid, SessionSender>,
}

impl Sessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, connection_id: Uuid, tx: SessionSender) {
        self.senders.insert(connection_id, tx);
    }

    /// Returns `true` if the connection was registered.
    pub fn remove(&mut self, connection_id: Uuid) -> bool {
        self.senders.remove(&connection_id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    #[cfg(test)]
    #[must_use]
    pub fn contains(&self, connection_id: Uuid) -> bool {
        self.senders.contains_key(&connection_id)
    }

    /// Serialize `message` and deliver it to every session not in `exclude`.
    /// Returns how many sessions accepted it.
    pub fn broadcast(&mut self, message: &Outbound, exclude: &[Uuid]) -> usize {
        match serde_json::to_string(message) {
            Ok(text) => self.broadcast_text(&text, exclude),
            Err(e) => {
                warn!(error = %e, "fanout: failed to serialize message");
                0
            }
        }
    }

    /// Deliver already-serialized text, used to relay client payloads
    /// verbatim. Sessions whose receiver is gone are pruned.
    pub fn broadcast_text(&mut self, text: &str, exclude: &[Uuid]) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for (connection_id, tx) in &self.senders {
            if exclude.contains(connection_id) {
                continue;
            }
            match tx.try_send(text.to_owned()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(%connection_id, "fanout: session channel full; dropping message");
                }
                Err(TrySendError::Closed(_)) => closed.push(*connection_id),
            }
        }

        for connection_id in closed {
            self.senders.remove(&connection_id);
            debug!(%connection_id, "fanout: pruned closed session");
        }
        delivered
    }

    /// Send one message to a single session.
    pub fn send_to(&mut self, connection_id: Uuid, message: &Outbound) -> bool {
        let Some(tx) = self.senders.get(&connection_id) else {
            return false;
        };
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "fanout: failed to serialize message");
                return false;
            }
        };
        tx.try_send(text).is_ok()
    }
}

#[cfg(test)]
#[path = "fanout_test.rs"]
mod tests;
