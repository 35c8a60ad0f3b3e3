//! Statements pool refresh: loads the list of statements a host can queue.
//!
//! The pool either arrives inline with the request or is fetched from an
//! external listing service. Fetching happens on a spawned task so the room
//! keeps ticking; the room learns the outcome via `RoomCommand::PoolLoaded`
//! and announces it to every client. A failed refresh leaves the previous
//! pool in place. No retries: the host asks again.

use std::time::Duration;

use tracing::info;

use crate::config::PoolConfig;
use crate::protocol::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("either json or conversationId is required")]
    MissingSource,
    #[error("invalid statements json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("statements pool must be a JSON array")]
    NotAnArray,
    #[error("statements fetch failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("statements fetch returned status {0}")]
    Status(u16),
}

impl ErrorCode for PoolError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingSource => "E_POOL_SOURCE",
            Self::Parse(_) | Self::NotAnArray => "E_POOL_FORMAT",
            Self::Http(_) => "E_POOL_FETCH",
            Self::Status(_) => "E_POOL_STATUS",
        }
    }
}

/// Where a refresh takes its statements from.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolSource {
    Inline(serde_json::Value),
    Remote { base_url: String, conversation_id: String },
}

impl PoolSource {
    /// Pick a source from the client's request. Inline JSON wins over a
    /// conversation id; inline JSON may itself be a JSON-encoded string.
    ///
    /// # Errors
    ///
    /// Returns `MissingSource` when neither is given, or `Parse` when an
    /// inline string is not valid JSON.
    pub fn resolve(
        json: Option<serde_json::Value>,
        conversation_id: Option<String>,
        base_url: Option<String>,
        config: &PoolConfig,
    ) -> Result<Self, PoolError> {
        match (json, conversation_id) {
            (Some(serde_json::Value::String(text)), _) => Ok(Self::Inline(serde_json::from_str(&text)?)),
            (Some(value), _) if !value.is_null() => Ok(Self::Inline(value)),
            (_, Some(conversation_id)) if !conversation_id.trim().is_empty() => {
                let base_url = base_url
                    .filter(|u| !u.trim().is_empty())
                    .unwrap_or_else(|| config.base_url.clone())
                    .trim_end_matches('/')
                    .to_string();
                Ok(Self::Remote { base_url, conversation_id: conversation_id.trim().to_string() })
            }
            _ => Err(PoolError::MissingSource),
        }
    }
}

/// Accept only an array of statements.
///
/// # Errors
///
/// Returns `NotAnArray` for any other JSON shape.
pub fn normalize(value: serde_json::Value) -> Result<serde_json::Value, PoolError> {
    if value.is_array() { Ok(value) } else { Err(PoolError::NotAnArray) }
}

/// Resolve a source to a validated pool, fetching over HTTP if needed.
///
/// # Errors
///
/// Returns transport, status, or format errors from the fetch.
pub async fn load(
    client: &reqwest::Client,
    source: PoolSource,
    timeout: Duration,
) -> Result<serde_json::Value, PoolError> {
    match source {
        PoolSource::Inline(value) => normalize(value),
        PoolSource::Remote { base_url, conversation_id } => {
            let url = format!("{base_url}/comments");
            info!(%url, %conversation_id, "pool: fetching statements");
            let response = client
                .get(&url)
                .query(&[("conversation_id", conversation_id.as_str())])
                .timeout(timeout)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(PoolError::Status(response.status().as_u16()));
            }
            let value: serde_json::Value = response.json().await?;
            normalize(value)
        }
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod tests;
