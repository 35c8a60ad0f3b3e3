//! Admin vote routes.
//!
//! Thin HTTP translation over the room actor: each handler turns the request
//! into one `RoomCommand`, awaits the reply, and maps errors to a status plus
//! an `{error, code}` body.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::protocol::{ErrorCode, error_body};
use crate::services::ledger::{LedgerError, VoteSubmission};
use crate::services::room::{RoomCommand, VoteListing};
use crate::state::{AppState, RoomError};

/// Error response: status plus `{error, code}` JSON.
pub type ApiError = (StatusCode, Json<Value>);

pub(crate) fn ledger_error_to_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::Malformed(_)
        | LedgerError::MissingUserId
        | LedgerError::InvalidStatementId
        | LedgerError::InvalidVote => StatusCode::BAD_REQUEST,
    }
}

pub(crate) fn room_error_to_status(err: &RoomError) -> StatusCode {
    match err {
        RoomError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn api_error(status: StatusCode, err: &impl ErrorCode) -> ApiError {
    (status, Json(error_body(err)))
}

fn room_unavailable(err: &RoomError) -> ApiError {
    warn!(error = %err, "votes: room did not answer");
    api_error(room_error_to_status(err), err)
}

/// `POST /rooms/{room}/votes`
///
/// # Errors
///
/// 400 for an invalid submission, 503 if the room could not be reached.
pub async fn submit_vote(
    State(state): State<AppState>,
    Path(room): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let rejected = |err: LedgerError| {
        info!(%room, error = %err, "votes: submission rejected");
        api_error(ledger_error_to_status(&err), &err)
    };

    let submission = VoteSubmission::from_slice(&body).map_err(rejected)?;
    let count = state
        .request(&room, |reply| RoomCommand::SubmitVote { submission: submission.clone(), reply })
        .await
        .map_err(|e| room_unavailable(&e))?
        .map_err(rejected)?;

    info!(%room, count, "votes: vote recorded");
    Ok(Json(json!({ "ok": true, "count": count })))
}

/// `GET /rooms/{room}/votes`
///
/// # Errors
///
/// 503 if the room could not be reached.
pub async fn list_votes(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<VoteListing>, ApiError> {
    let listing = state
        .request(&room, |reply| RoomCommand::ListVotes { reply })
        .await
        .map_err(|e| room_unavailable(&e))?;
    Ok(Json(listing))
}

/// `DELETE /rooms/{room}/votes`
///
/// # Errors
///
/// 503 if the room could not be reached.
pub async fn clear_votes(State(state): State<AppState>, Path(room): Path<String>) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .request(&room, |reply| RoomCommand::ClearVotes { reply })
        .await
        .map_err(|e| room_unavailable(&e))?;
    Ok(Json(json!({ "ok": true, "deleted": deleted })))
}

#[cfg(test)]
#[path = "votes_test.rs"]
mod tests;
