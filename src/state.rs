//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the process configuration, a shared HTTP client for pool refreshes,
//! and the room registry: room name → handle of that room's actor. The
//! registry lock only guards the map; room state itself lives inside each
//! actor and is never shared.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, oneshot};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::protocol::ErrorCode;
use crate::services::room::{self, Room, RoomCommand, RoomHandle};

/// Attempts made by `AppState::request` before giving up on a room.
const ROOM_REQUEST_ATTEMPTS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room unavailable: {0}")]
    Unavailable(String),
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "E_ROOM_UNAVAILABLE",
        }
    }
}

/// Shared application state, injected into Axum handlers via State extractor.
/// Cheap to clone: every field is an `Arc` or a pooled client.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
    pub http: reqwest::Client,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config: Arc::new(config), rooms: Arc::new(RwLock::new(HashMap::new())), http: reqwest::Client::new() }
    }

    /// Handle for `name`, spawning the room actor if it is not running.
    pub async fn room(&self, name: &str) -> RoomHandle {
        {
            let rooms = self.rooms.read().await;
            if let Some(handle) = rooms.get(name).filter(|h| !h.is_closed()) {
                return handle.clone();
            }
        }

        let mut rooms = self.rooms.write().await;
        if let Some(handle) = rooms.get(name).filter(|h| !h.is_closed()) {
            return handle.clone();
        }
        let handle = room::spawn_room(name, self.clone());
        rooms.insert(name.to_string(), handle.clone());
        info!(room = %name, rooms = rooms.len(), "registry: room created");
        handle
    }

    /// Send a command that expects a reply. If the room shut down between
    /// lookup and delivery, a fresh actor is spawned and the request retried.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Unavailable` if no attempt got a reply.
    pub async fn request<T>(
        &self,
        name: &str,
        make: impl Fn(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        for _ in 0..ROOM_REQUEST_ATTEMPTS {
            let handle = self.room(name).await;
            let (reply_tx, reply_rx) = oneshot::channel();
            if handle.send(make(reply_tx)).await.is_err() {
                continue;
            }
            if let Ok(value) = reply_rx.await {
                return Ok(value);
            }
        }
        Err(RoomError::Unavailable(name.to_string()))
    }

    /// Remove a room from the registry if it is still idle and has no
    /// commands waiting. Called by the room actor itself; returns `true` when
    /// the actor should stop.
    pub(crate) async fn evict_room_if_idle(
        &self,
        name: &str,
        instance: Uuid,
        room: &Room,
        rx: &mut mpsc::Receiver<RoomCommand>,
    ) -> bool {
        let mut rooms = self.rooms.write().await;
        // No new handle can be handed out while the write lock is held.
        if !room.is_idle() || !rx.is_empty() {
            return false;
        }
        if rooms.get(name).is_some_and(|h| h.instance() == instance) {
            rooms.remove(name);
        }
        rx.close();
        drop(rooms);

        // Commands sent through stale handles are dropped; their reply
        // channels close and callers retry against a fresh room.
        while rx.try_recv().is_ok() {}
        info!(room = %name, "registry: evicted idle room");
        true
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
