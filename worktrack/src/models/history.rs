//! History models: wire entries and the derived, display-ready bucket.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{lenient_string, lenient_timestamp, HistoryWindow};
use crate::elapsed::elapsed_between;

/// The owner embedded in a history entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default, alias = "_id", deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

/// A session plus its owner, as returned by a history endpoint.
///
/// Every field is optional so that one odd row never hides the whole view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, alias = "_id", deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_owner")]
    pub user: Option<Owner>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub stop_time: Option<DateTime<Utc>>,
}

/// Deserialize an embedded owner; a bare id reference carries no name.
fn lenient_owner<'de, D>(deserializer: D) -> Result<Option<Owner>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(value @ serde_json::Value::Object(_)) => serde_json::from_value(value).ok(),
        Some(serde_json::Value::String(id)) => Some(Owner {
            id: Some(id),
            name: None,
        }),
        _ => None,
    })
}

impl HistoryEntry {
    /// Parse one entry, falling back to an empty entry if it is not an object.
    pub fn from_value(value: serde_json::Value) -> Self {
        serde_json::from_value(value).unwrap_or_default()
    }
}

/// One rendered history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub owner_name: String,
    pub description: String,
    pub elapsed_seconds: u64,
    /// UTC calendar date of the session start, matching the daily window.
    pub date: Option<NaiveDate>,
    /// Still running; the elapsed value keeps growing on refresh.
    pub running: bool,
    pub start_time: Option<DateTime<Utc>>,
    pub stop_time: Option<DateTime<Utc>>,
}

impl HistoryRow {
    pub fn from_entry(entry: &HistoryEntry, now: DateTime<Utc>) -> Self {
        let owner_name = entry
            .user
            .as_ref()
            .and_then(|u| u.name.clone())
            .unwrap_or_default();

        Self {
            owner_name,
            description: entry.description.clone().unwrap_or_default(),
            elapsed_seconds: elapsed_between(entry.start_time, entry.stop_time, now),
            date: entry
                .start_time
                .map(|t| t.date_naive()),
            running: entry.start_time.is_some() && entry.stop_time.is_none(),
            start_time: entry.start_time,
            stop_time: entry.stop_time,
        }
    }
}

/// The sessions of one window, in the order the service returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryBucket {
    pub window: HistoryWindow,
    pub rows: Vec<HistoryRow>,
    pub fetched_at: DateTime<Utc>,
    /// Served from the offline cache because the service was unreachable.
    #[serde(default)]
    pub stale: bool,
}

impl HistoryBucket {
    pub fn from_entries(window: HistoryWindow, entries: &[HistoryEntry], now: DateTime<Utc>) -> Self {
        Self {
            window,
            rows: entries.iter().map(|e| HistoryRow::from_entry(e, now)).collect(),
            fetched_at: now,
            stale: false,
        }
    }

    /// Recompute the elapsed time of rows that are still running.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        for row in self.rows.iter_mut().filter(|r| r.running) {
            row.elapsed_seconds = elapsed_between(row.start_time, None, now);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of elapsed time across all rows.
    pub fn total_seconds(&self) -> u64 {
        self.rows.iter().map(|r| r.elapsed_seconds).sum()
    }
}
