//! Work session model: one start→stop interval of tracked work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::elapsed::elapsed_seconds;

/// A work session as recorded by the remote service.
///
/// `stop_time` absent means the session is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkSession {
    /// Identifier assigned by the service on creation.
    #[serde(alias = "_id")]
    pub id: String,
    /// The user this session belongs to. Never reassigned.
    pub owner_id: String,
    /// Free-text description of the work.
    #[serde(default)]
    pub description: String,
    /// When the session started.
    pub start_time: DateTime<Utc>,
    /// When the session stopped, if it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<DateTime<Utc>>,
}

impl WorkSession {
    /// Whether the session is still running.
    pub const fn is_running(&self) -> bool {
        self.stop_time.is_none()
    }

    /// Whole seconds of work, measured to `stop_time` or `now` if running.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        elapsed_seconds(Some(self), now)
    }
}

/// Body of a create-session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkSession {
    pub owner_id: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
}

/// Body of an update-session request. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time: Option<DateTime<Utc>>,
}

impl SessionPatch {
    /// The full update sent on completion: final description and stop time.
    pub fn complete(description: impl Into<String>, stop_time: DateTime<Utc>) -> Self {
        Self {
            description: Some(description.into()),
            stop_time: Some(stop_time),
        }
    }

    /// A description-only edit of a running session.
    pub fn describe(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            stop_time: None,
        }
    }
}
