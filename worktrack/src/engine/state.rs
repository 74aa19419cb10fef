use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one card's work session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// No session running; a description may be entered and work started.
    #[default]
    Idle,
    /// A session is running on the service.
    Running,
    /// The session has been stopped and confirmed; its description is frozen.
    Stopped,
}

impl SessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    /// Whether the description field accepts edits in this state.
    pub const fn accepts_edits(self) -> bool {
        matches!(self, Self::Idle | Self::Running)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inline error shown on the description field. Never changes the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldError {
    /// Start or complete was attempted with an empty description.
    EmptyDescription,
    /// An edit was attempted after the session stopped.
    Locked,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EmptyDescription => "Work description is required",
            Self::Locked => "Work description can no longer be changed",
        })
    }
}
