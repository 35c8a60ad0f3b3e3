//! Room coordinator: one actor task per room owning all room state.
//!
//! DESIGN
//! ======
//! `Room` is the synchronous state machine: sessions, queue, ledger,
//! simulator and statements pool. It never awaits. `run_room` owns a `Room`
//! and drains a `RoomCommand` channel, so connects, inbound messages, admin
//! requests and simulator ticks each run to completion in arrival order and
//! nothing needs a lock.
//!
//! Handlers return an `Effect` for the work they cannot do synchronously:
//! arming or disarming the tick timer, or starting a pool fetch. The actor
//! loop applies it after the handler returns.
//!
//! LIFECYCLE
//! =========
//! 1. `AppState::room` spawns the actor on first use of a room name
//! 2. Commands flow in over the channel until the room goes idle
//! 3. Idle (no sessions, no ghosts, no votes, empty queue) → evicted from
//!    the registry, timer disarmed, task exits

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{PoolConfig, RoomConfig};
use crate::protocol::{Inbound, Outbound, now_ms};
use crate::services::fanout::{SessionSender, Sessions};
use crate::services::ghost::Simulator;
use crate::services::ledger::{Ledger, LedgerError, Tally, Vote, VoteSubmission};
use crate::services::pool::{self, PoolError, PoolSource};
use crate::services::queue::Queue;
use crate::state::AppState;

const ROOM_COMMAND_CAPACITY: usize = 1024;

// =============================================================================
// COMMANDS
// =============================================================================

#[derive(Debug)]
pub enum RoomCommand {
    /// Register a session. The welcome snapshot is queued on `tx` before
    /// `ack` fires.
    Connect { connection_id: Uuid, tx: SessionSender, ack: oneshot::Sender<()> },
    Disconnect { connection_id: Uuid },
    /// Raw text frame from a session.
    Inbound { connection_id: Uuid, text: String },
    SubmitVote { submission: VoteSubmission, reply: oneshot::Sender<Result<usize, LedgerError>> },
    ListVotes { reply: oneshot::Sender<VoteListing> },
    ClearVotes { reply: oneshot::Sender<usize> },
    /// Simulator tick from the timer armed with `generation`.
    Tick { generation: u64 },
    PoolLoaded { result: Result<serde_json::Value, PoolError> },
}

/// Deferred work requested by a handler.
#[derive(Debug, PartialEq)]
pub enum Effect {
    None,
    ArmTicker,
    DisarmTicker,
    LoadPool(PoolSource),
}

/// Admin view of the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct VoteListing {
    pub votes: Vec<Vote>,
    pub count: usize,
    pub tallies: Vec<Tally>,
}

// =============================================================================
// ROOM STATE
// =============================================================================

pub struct Room {
    name: String,
    config: RoomConfig,
    queue: Queue,
    ledger: Ledger,
    sessions: Sessions,
    simulator: Simulator,
    pool: Option<serde_json::Value>,
    pool_config: PoolConfig,
}

impl Room {
    #[must_use]
    pub fn new(name: impl Into<String>, config: RoomConfig, pool_config: PoolConfig) -> Self {
        Self::with_simulator(name, config, pool_config, Simulator::new(config))
    }

    #[must_use]
    pub fn with_simulator(
        name: impl Into<String>,
        config: RoomConfig,
        pool_config: PoolConfig,
        simulator: Simulator,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            queue: Queue::new(config.activation_delay_ms, config.fallback_statement_id),
            ledger: Ledger::new(),
            sessions: Sessions::new(),
            simulator,
            pool: None,
            pool_config,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[cfg(test)]
    #[must_use]
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    #[cfg(test)]
    #[must_use]
    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    #[cfg(test)]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn pool(&self) -> Option<&serde_json::Value> {
        self.pool.as_ref()
    }

    /// Nothing worth keeping in memory: safe to evict. A loaded pool counts
    /// as state, so a host reloading the only tab gets it replayed.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.sessions.is_empty()
            && !self.simulator.is_enabled()
            && self.ledger.is_empty()
            && self.queue.is_empty()
            && self.pool.is_none()
    }

    // -------------------------------------------------------------------------
    // SESSIONS
    // -------------------------------------------------------------------------

    /// Register a session and send it the full state snapshot.
    pub fn connect(&mut self, connection_id: Uuid, tx: SessionSender, now: i64) {
        self.sessions.insert(connection_id, tx);
        let welcome = Outbound::Connected {
            connection_id,
            active_statement_id: self.queue.active_id(now),
            all_selected_statements: self.queue.snapshot(),
            current_time: now,
            ghost_cursors_enabled: self.simulator.is_enabled(),
            vote_count: self.ledger.count(),
        };
        self.sessions.send_to(connection_id, &welcome);
        if let Some(pool) = &self.pool {
            self.sessions
                .send_to(connection_id, &Outbound::StatementsPoolUpdated { pool: pool.clone() });
        }
        info!(room = %self.name, %connection_id, sessions = self.sessions.len(), "room: session connected");
    }

    pub fn disconnect(&mut self, connection_id: Uuid) {
        if self.sessions.remove(connection_id) {
            info!(room = %self.name, %connection_id, sessions = self.sessions.len(), "room: session left");
        }
    }

    // -------------------------------------------------------------------------
    // INBOUND
    // -------------------------------------------------------------------------

    /// Classify one inbound frame and route it. Malformed frames are logged
    /// and dropped; the session stays open.
    pub fn handle_text(&mut self, connection_id: Uuid, text: &str, now: i64) -> Effect {
        let msg: Inbound = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(room = %self.name, %connection_id, error = %e, "room: dropping malformed message");
                return Effect::None;
            }
        };

        match msg {
            Inbound::Move { .. } | Inbound::Touch { .. } | Inbound::Remove { .. } => {
                self.sessions.broadcast_text(text, &[connection_id]);
                Effect::None
            }
            Inbound::SetActiveStatement { statement_id } => {
                self.queue.activate_now(statement_id, now);
                info!(room = %self.name, statement_id, "room: statement activated immediately");
                self.sessions
                    .broadcast(&Outbound::ActiveStatementChanged { statement_id }, &[]);
                self.broadcast_queue(now);
                Effect::None
            }
            Inbound::QueueStatement { statement_id } => {
                let item = self.queue.enqueue(statement_id, now);
                info!(
                    room = %self.name,
                    statement_id,
                    activates_in_ms = item.activation_time - now,
                    "room: statement queued"
                );
                self.broadcast_queue(now);
                Effect::None
            }
            Inbound::ClearQueue => {
                let removed = self.queue.clear_future(now);
                info!(room = %self.name, removed, "room: queue cleared");
                self.broadcast_queue(now);
                Effect::None
            }
            Inbound::SetGhostCursors { enabled } => self.set_ghost_cursors(enabled, now),
            Inbound::UpdateStatementsPool { json, conversation_id, base_url } => {
                match PoolSource::resolve(json, conversation_id, base_url, &self.pool_config) {
                    Ok(PoolSource::Inline(value)) => {
                        self.pool_loaded(pool::normalize(value));
                        Effect::None
                    }
                    Ok(source) => Effect::LoadPool(source),
                    Err(e) => {
                        self.pool_loaded(Err(e));
                        Effect::None
                    }
                }
            }
        }
    }

    fn broadcast_queue(&mut self, now: i64) {
        let msg = Outbound::QueueUpdated { all_selected_statements: self.queue.snapshot(), current_time: now };
        self.sessions.broadcast(&msg, &[]);
    }

    // -------------------------------------------------------------------------
    // SIMULATOR
    // -------------------------------------------------------------------------

    /// Enable (or re-spawn) or tear down the ghost population.
    pub fn set_ghost_cursors(&mut self, enabled: bool, now: i64) -> Effect {
        if enabled {
            self.simulator.enable(&self.queue, now);
            info!(room = %self.name, ghosts = self.simulator.cursors().len(), "room: ghost cursors enabled");
            self.sessions
                .broadcast(&Outbound::GhostCursorsChanged { enabled: true }, &[]);
            return Effect::ArmTicker;
        }

        if !self.simulator.is_enabled() {
            return Effect::DisarmTicker;
        }
        let removed = self.simulator.disable(now);
        for position in removed.iter().cloned() {
            self.sessions.broadcast(&Outbound::Remove { position }, &[]);
        }
        info!(room = %self.name, removed = removed.len(), "room: ghost cursors disabled");
        self.sessions
            .broadcast(&Outbound::GhostCursorsChanged { enabled: false }, &[]);
        Effect::DisarmTicker
    }

    /// One simulator step: every ghost position goes out as a `move`.
    pub fn tick(&mut self, now: i64) {
        for position in self.simulator.tick(&self.queue, now) {
            self.sessions.broadcast(&Outbound::Move { position }, &[]);
        }
    }

    // -------------------------------------------------------------------------
    // LEDGER
    // -------------------------------------------------------------------------

    /// Validate and record a vote; peers learn the new count.
    ///
    /// # Errors
    ///
    /// Returns the validation failure without touching the ledger.
    pub fn submit_vote(&mut self, submission: VoteSubmission, now: i64) -> Result<usize, LedgerError> {
        let count = self.ledger.submit(submission, now)?;
        self.sessions.broadcast(&Outbound::VotesUpdated { count }, &[]);
        Ok(count)
    }

    #[must_use]
    pub fn vote_listing(&self) -> VoteListing {
        VoteListing { votes: self.ledger.list_all(), count: self.ledger.count(), tallies: self.ledger.tallies() }
    }

    pub fn clear_votes(&mut self) -> usize {
        let deleted = self.ledger.clear_all();
        info!(room = %self.name, deleted, "room: votes cleared");
        self.sessions.broadcast(&Outbound::VotesUpdated { count: 0 }, &[]);
        deleted
    }

    // -------------------------------------------------------------------------
    // STATEMENTS POOL
    // -------------------------------------------------------------------------

    /// Apply a refresh outcome. Failures keep the previous pool.
    pub fn pool_loaded(&mut self, result: Result<serde_json::Value, PoolError>) {
        match result {
            Ok(pool) => {
                let size = pool.as_array().map_or(0, Vec::len);
                info!(room = %self.name, size, "room: statements pool updated");
                self.sessions
                    .broadcast(&Outbound::StatementsPoolUpdated { pool: pool.clone() }, &[]);
                self.pool = Some(pool);
            }
            Err(e) => {
                warn!(room = %self.name, error = %e, "room: statements pool refresh failed");
                self.sessions
                    .broadcast(&Outbound::StatementsPoolError { error: e.to_string() }, &[]);
            }
        }
    }
}

// =============================================================================
// TICK TIMER
// =============================================================================

/// Repeating simulator timer. Each arm gets a new generation so ticks that
/// were already in flight when the timer was disarmed are ignored.
#[derive(Default)]
struct Ticker {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl Ticker {
    fn arm(&mut self, period: Duration, tx: mpsc::WeakSender<RoomCommand>) {
        self.disarm();
        self.generation += 1;
        let generation = self.generation;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(tx) = tx.upgrade() else { break };
                match tx.try_send(RoomCommand::Tick { generation }) {
                    Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        }));
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.disarm();
    }
}

// =============================================================================
// ACTOR
// =============================================================================

/// Cloneable address of a running room actor.
#[derive(Clone, Debug)]
pub struct RoomHandle {
    instance: Uuid,
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    #[must_use]
    pub fn instance(&self) -> Uuid {
        self.instance
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a command for the room.
    ///
    /// # Errors
    ///
    /// Returns the command back if the room has shut down.
    pub async fn send(&self, command: RoomCommand) -> Result<(), mpsc::error::SendError<RoomCommand>> {
        self.tx.send(command).await
    }
}

/// Spawn the actor for `name` and return its handle. The caller registers
/// the handle.
#[must_use]
pub fn spawn_room(name: &str, state: AppState) -> RoomHandle {
    let room = Room::new(name, state.config.room, state.config.pool.clone());
    spawn_with(room, state)
}

/// Spawn an actor around a pre-built room.
fn spawn_with(room: Room, state: AppState) -> RoomHandle {
    let (tx, rx) = mpsc::channel(ROOM_COMMAND_CAPACITY);
    let handle = RoomHandle { instance: Uuid::new_v4(), tx: tx.clone() };
    tokio::spawn(run_room(room, rx, tx.downgrade(), state, handle.instance));
    handle
}

async fn run_room(
    mut room: Room,
    mut rx: mpsc::Receiver<RoomCommand>,
    self_tx: mpsc::WeakSender<RoomCommand>,
    state: AppState,
    instance: Uuid,
) {
    let mut ticker = Ticker::default();
    info!(room = %room.name(), "room: actor started");

    while let Some(command) = rx.recv().await {
        let now = now_ms();
        let is_tick = matches!(command, RoomCommand::Tick { .. });

        let effect = match command {
            RoomCommand::Connect { connection_id, tx, ack } => {
                room.connect(connection_id, tx, now);
                let _ = ack.send(());
                Effect::None
            }
            RoomCommand::Disconnect { connection_id } => {
                room.disconnect(connection_id);
                Effect::None
            }
            RoomCommand::Inbound { connection_id, text } => room.handle_text(connection_id, &text, now),
            RoomCommand::SubmitVote { submission, reply } => {
                let _ = reply.send(room.submit_vote(submission, now));
                Effect::None
            }
            RoomCommand::ListVotes { reply } => {
                let _ = reply.send(room.vote_listing());
                Effect::None
            }
            RoomCommand::ClearVotes { reply } => {
                let _ = reply.send(room.clear_votes());
                Effect::None
            }
            RoomCommand::Tick { generation } => {
                if ticker.is_current(generation) {
                    room.tick(now);
                }
                Effect::None
            }
            RoomCommand::PoolLoaded { result } => {
                room.pool_loaded(result);
                Effect::None
            }
        };

        match effect {
            Effect::None => {}
            Effect::ArmTicker => ticker.arm(room.config.tick_interval(), self_tx.clone()),
            Effect::DisarmTicker => ticker.disarm(),
            Effect::LoadPool(source) => spawn_pool_load(&state, source, self_tx.clone()),
        }

        if !is_tick && room.is_idle() && state.evict_room_if_idle(room.name(), instance, &room, &mut rx).await {
            break;
        }
    }

    ticker.disarm();
    info!(room = %room.name(), "room: actor stopped");
}

fn spawn_pool_load(state: &AppState, source: PoolSource, tx: mpsc::WeakSender<RoomCommand>) {
    let client = state.http.clone();
    let timeout = Duration::from_secs(state.config.pool.timeout_secs);
    tokio::spawn(async move {
        let result = pool::load(&client, source, timeout).await;
        if let Some(tx) = tx.upgrade() {
            let _ = tx.send(RoomCommand::PoolLoaded { result }).await;
        }
    });
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
