//! Error types for the worktrack library.

use reqwest::StatusCode;
use thiserror::Error;

use crate::engine::SessionState;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while tracking a work session.
#[derive(Debug, Error)]
pub enum Error {
    /// The description was empty at start/complete time. Never reaches the network.
    #[error("work description must not be empty")]
    EmptyDescription,

    /// The description was edited after the session stopped.
    #[error("work description is read-only once the session has stopped")]
    DescriptionLocked,

    /// The requested action is not valid from the card's current state.
    #[error("cannot {action} a card that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },

    /// A start or complete request is still in flight for this card.
    #[error("a request is already in flight for card {0}")]
    Busy(usize),

    /// No card exists at the given index.
    #[error("no card at index {0}")]
    UnknownCard(usize),

    /// The request never produced a response (connection refused, DNS, ...).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },

    /// The service answered, but the body was not what we expected.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A custom history range could not be understood.
    #[error("invalid date range: {0}")]
    InvalidRange(String),

    /// Reading or writing the local offline cache failed.
    #[error("cache error: {0}")]
    Cache(String),
}

impl Error {
    /// Whether this error came from talking to the remote service.
    ///
    /// These are the failures that roll the engine back to its pre-attempt
    /// state and get pushed to the notification channel.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Status { .. } | Self::MalformedResponse(_)
        )
    }

    /// Whether this is a local validation failure (shown inline, not notified).
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyDescription | Self::DescriptionLocked)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Cache(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Cache(e.to_string())
    }
}
