//! Unified error handling for banwatch.
//!
//! Two error families cross the crate boundary: [`FetchError`] for read-only
//! collaborator calls and [`ActionError`] for commands (unban, escalate).
//! Stale responses are not errors; the refresh coordinator discards them
//! silently. "No host selected" and "no active bans" are view states, not
//! errors, and must never be conflated with fetch failures.

use thiserror::Error;

/// Errors from fetching data off the backend.
///
/// None of these are fatal: the coordinator retains last-known-good data
/// where it exists and surfaces an explicit unavailable state otherwise.
/// There is no automatic retry; the next triggered reload is the retry.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Static code for structured log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Transport(err)
        }
    }
}

/// Errors from backend commands (unban, escalate-to-firewall).
///
/// A rejected command leaves the record's displayed state unchanged; the
/// backend-provided reason is carried to the caller verbatim.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Commands require a selected host context.
    #[error("no host selected")]
    NoAgentSelected,

    /// The backend refused the command.
    #[error("command rejected: {0}")]
    Rejected(String),

    /// The command request itself failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ActionError {
    /// Static code for structured log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoAgentSelected => "no_agent_selected",
            Self::Rejected(_) => "rejected",
            Self::Fetch(e) => e.error_code(),
        }
    }
}
