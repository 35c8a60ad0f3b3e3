//! Response ledger: append-only vote records.
//!
//! DESIGN
//! ======
//! Submissions arrive as loosely typed JSON from the admin route and are
//! validated into a `Vote` before anything is appended. A rejected
//! submission never mutates the ledger. There is no dedup: the same user may
//! vote on the same statement many times and every record is kept.

use serde::{Deserialize, Serialize};

use crate::protocol::ErrorCode;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("malformed vote payload: {0}")]
    Malformed(String),
    #[error("userId required")]
    MissingUserId,
    #[error("statementId must be an integer")]
    InvalidStatementId,
    #[error("vote must be -1, 0 or 1")]
    InvalidVote,
}

impl ErrorCode for LedgerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "E_VOTE_MALFORMED",
            Self::MissingUserId => "E_VOTE_USER_ID",
            Self::InvalidStatementId => "E_VOTE_STATEMENT_ID",
            Self::InvalidVote => "E_VOTE_VALUE",
        }
    }
}

/// The three response levels a participant can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum VoteValue {
    Disagree,
    Pass,
    Agree,
}

impl From<VoteValue> for i8 {
    fn from(value: VoteValue) -> Self {
        match value {
            VoteValue::Disagree => -1,
            VoteValue::Pass => 0,
            VoteValue::Agree => 1,
        }
    }
}

impl TryFrom<i8> for VoteValue {
    type Error = LedgerError;

    fn try_from(raw: i8) -> Result<Self, Self::Error> {
        match raw {
            -1 => Ok(Self::Disagree),
            0 => Ok(Self::Pass),
            1 => Ok(Self::Agree),
            _ => Err(LedgerError::InvalidVote),
        }
    }
}

/// A validated, recorded response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub user_id: String,
    pub statement_id: i64,
    pub vote: VoteValue,
    pub timestamp: i64,
}

/// Raw submission as posted by a client. Every field is checked by
/// `validate`, so nothing here is trusted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSubmission {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub statement_id: Option<serde_json::Value>,
    #[serde(default, alias = "value")]
    pub vote: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl VoteSubmission {
    /// Parse a request body.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Malformed` if the body is not a JSON object of
    /// the expected shape.
    pub fn from_slice(body: &[u8]) -> Result<Self, LedgerError> {
        serde_json::from_slice(body).map_err(|e| LedgerError::Malformed(e.to_string()))
    }

    /// Check every field and build a `Vote`, stamping `now` when the client
    /// sent no timestamp.
    ///
    /// # Errors
    ///
    /// Returns the first failing check.
    pub fn validate(self, now: i64) -> Result<Vote, LedgerError> {
        let user_id = self
            .user_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(LedgerError::MissingUserId)?;
        let statement_id = self
            .statement_id
            .as_ref()
            .and_then(parse_statement_id)
            .ok_or(LedgerError::InvalidStatementId)?;
        let vote = self
            .vote
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .and_then(|v| i8::try_from(v).ok())
            .ok_or(LedgerError::InvalidVote)
            .and_then(VoteValue::try_from)?;

        Ok(Vote { user_id, statement_id, vote, timestamp: self.timestamp.unwrap_or(now) })
    }
}

fn parse_statement_id(raw: &serde_json::Value) -> Option<i64> {
    match raw {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Agree/disagree/pass counts for one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub statement_id: i64,
    pub agree: usize,
    pub disagree: usize,
    pub pass: usize,
}

// =============================================================================
// LEDGER
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    votes: Vec<Vote>,
}

impl Ledger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append. Returns the new total count.
    ///
    /// # Errors
    ///
    /// Returns the validation failure; the ledger is untouched.
    pub fn submit(&mut self, submission: VoteSubmission, now: i64) -> Result<usize, LedgerError> {
        let vote = submission.validate(now)?;
        self.votes.push(vote);
        Ok(self.votes.len())
    }

    #[must_use]
    pub fn list_all(&self) -> Vec<Vote> {
        self.votes.clone()
    }

    /// Empty the ledger, returning how many records were dropped.
    pub fn clear_all(&mut self) -> usize {
        let count = self.votes.len();
        self.votes.clear();
        count
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.votes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Per-statement counts, ordered by statement id.
    #[must_use]
    pub fn tallies(&self) -> Vec<Tally> {
        let mut by_statement: std::collections::BTreeMap<i64, Tally> = std::collections::BTreeMap::new();
        for vote in &self.votes {
            let tally = by_statement
                .entry(vote.statement_id)
                .or_insert_with(|| Tally { statement_id: vote.statement_id, ..Tally::default() });
            match vote.vote {
                VoteValue::Agree => tally.agree += 1,
                VoteValue::Disagree => tally.disagree += 1,
                VoteValue::Pass => tally.pass += 1,
            }
        }
        by_statement.into_values().collect()
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
