//! Protocol: the wire messages exchanged with room clients.
//!
//! ARCHITECTURE
//! ============
//! Every websocket payload is a JSON object tagged by `type`. Clients send
//! `Inbound` messages; the room coordinator emits `Outbound` messages through
//! the fanout. Field names are camelCase on the wire.
//!
//! DESIGN
//! ======
//! - Presence events (`move`, `touch`, `remove`) are relayed verbatim, so the
//!   coordinator only parses them to classify the message.
//! - Timestamps are milliseconds since the Unix epoch (`i64`).
//! - Statement ids are plain integers; `SENTINEL_STATEMENT_ID` marks an ended
//!   session.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Reserved statement id meaning "no statement active / session ended".
pub const SENTINEL_STATEMENT_ID: i64 = -1;

// =============================================================================
// TYPES
// =============================================================================

/// Pointer position of a participant, real or synthetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub timestamp: i64,
    pub user_id: String,
}

/// One scheduled entry of the statement queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub statement_id: i64,
    /// Activation time in milliseconds since Unix epoch.
    #[serde(rename = "timestamp")]
    pub activation_time: i64,
}

/// Messages a client may send to its room.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Inbound {
    Move { position: Position },
    Touch { position: Position },
    Remove { position: Position },
    SetActiveStatement { statement_id: i64 },
    QueueStatement { statement_id: i64 },
    ClearQueue,
    SetGhostCursors { enabled: bool },
    UpdateStatementsPool {
        #[serde(default)]
        json: Option<serde_json::Value>,
        #[serde(default)]
        conversation_id: Option<String>,
        #[serde(default)]
        base_url: Option<String>,
    },
}

/// Messages the room sends to its clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outbound {
    Connected {
        connection_id: Uuid,
        active_statement_id: i64,
        all_selected_statements: Vec<QueueItem>,
        current_time: i64,
        ghost_cursors_enabled: bool,
        vote_count: usize,
    },
    QueueUpdated {
        all_selected_statements: Vec<QueueItem>,
        current_time: i64,
    },
    ActiveStatementChanged {
        statement_id: i64,
    },
    GhostCursorsChanged {
        enabled: bool,
    },
    VotesUpdated {
        count: usize,
    },
    StatementsPoolUpdated {
        pool: serde_json::Value,
    },
    StatementsPoolError {
        error: String,
    },
    Move {
        position: Position,
    },
    Remove {
        position: Position,
    },
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code for structured error responses.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;
}

/// JSON body for an error response: `{"error": ..., "code": ...}`.
#[must_use]
pub fn error_body(err: &(impl ErrorCode + ?Sized)) -> serde_json::Value {
    serde_json::json!({ "error": err.to_string(), "code": err.error_code() })
}

// =============================================================================
// CLOCK
// =============================================================================

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
