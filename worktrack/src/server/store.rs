//! In-memory work store backing the reference service.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::models::{Card, NewWorkSession, SessionPatch, WorkSession};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// Why the store refused a request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown user {0}")]
    UnknownOwner(String),
    #[error("unknown work session {0}")]
    UnknownSession(String),
    #[error("description must not be empty")]
    EmptyDescription,
    #[error("user already has running session {0}")]
    AlreadyRunning(String),
    #[error("session {0} is already stopped")]
    AlreadyStopped(String),
    #[error("stop time precedes start time")]
    StopBeforeStart,
    #[error("user name must not be empty")]
    EmptyName,
}

/// A session joined with its owner, as returned by the history endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WindowEntry {
    #[serde(flatten)]
    pub session: WorkSession,
    pub user: User,
}

/// `[from, to)` bounds on a session's start time; no `to` means "through now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub from: DateTime<Utc>,
    pub to: Option<DateTime<Utc>>,
}

impl Bounds {
    /// Today's UTC calendar date.
    pub fn today(now: DateTime<Utc>) -> Self {
        Self {
            from: midnight(now.date_naive()),
            to: None,
        }
    }

    /// The trailing seven days.
    pub fn last_week(now: DateTime<Utc>) -> Self {
        Self {
            from: now - Duration::days(7),
            to: None,
        }
    }

    /// The trailing calendar month.
    pub fn last_month(now: DateTime<Utc>) -> Self {
        Self {
            from: now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30)),
            to: None,
        }
    }

    /// Explicit dates; `end` is exclusive.
    pub fn range(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self {
            from: midnight(start),
            to: end.map(midnight),
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.from && self.to.is_none_or(|to| t < to)
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    users: Vec<User>,
    sessions: Vec<WorkSession>,
}

/// Users and their sessions, optionally mirrored to a JSON file.
#[derive(Debug, Default)]
pub struct WorkStore {
    data: StoreData,
    path: Option<PathBuf>,
}

impl WorkStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store persisted at `path`, loading it if the file exists.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let data = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            StoreData::default()
        };
        Ok(Self {
            data,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn users(&self) -> &[User] {
        &self.data.users
    }

    pub fn add_user(&mut self, name: &str) -> Result<User, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let user = User {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
        };
        self.data.users.push(user.clone());
        self.persist();
        Ok(user)
    }

    fn user(&self, id: &str) -> Option<&User> {
        self.data.users.iter().find(|u| u.id == id)
    }

    /// Every user with their running session, or else their latest one.
    pub fn cards(&self) -> Vec<Card> {
        self.data
            .users
            .iter()
            .map(|user| {
                let mine = self.data.sessions.iter().filter(|s| s.owner_id == user.id);
                let last_work = mine
                    .clone()
                    .find(|s| s.is_running())
                    .or_else(|| mine.max_by_key(|s| s.start_time))
                    .cloned();
                Card {
                    id: user.id.clone(),
                    name: user.name.clone(),
                    last_work,
                }
            })
            .collect()
    }

    pub fn create(&mut self, new: &NewWorkSession) -> Result<WorkSession, StoreError> {
        if self.user(&new.owner_id).is_none() {
            return Err(StoreError::UnknownOwner(new.owner_id.clone()));
        }
        if new.description.trim().is_empty() {
            return Err(StoreError::EmptyDescription);
        }
        if let Some(running) = self
            .data
            .sessions
            .iter()
            .find(|s| s.owner_id == new.owner_id && s.is_running())
        {
            return Err(StoreError::AlreadyRunning(running.id.clone()));
        }

        let session = WorkSession {
            id: Uuid::now_v7().to_string(),
            owner_id: new.owner_id.clone(),
            description: new.description.clone(),
            start_time: new.start_time,
            stop_time: None,
        };
        debug!(session = %session.id, owner = %session.owner_id, "session created");
        self.data.sessions.push(session.clone());
        self.persist();
        Ok(session)
    }

    pub fn update(&mut self, id: &str, patch: &SessionPatch) -> Result<WorkSession, StoreError> {
        let session = self
            .data
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::UnknownSession(id.to_string()))?;

        if let Some(description) = &patch.description {
            if description.trim().is_empty() {
                return Err(StoreError::EmptyDescription);
            }
        }
        if let Some(stop) = patch.stop_time {
            if !session.is_running() {
                return Err(StoreError::AlreadyStopped(session.id.clone()));
            }
            if stop < session.start_time {
                return Err(StoreError::StopBeforeStart);
            }
        }

        if let Some(description) = &patch.description {
            session.description.clone_from(description);
        }
        if patch.stop_time.is_some() {
            session.stop_time = patch.stop_time;
        }

        let updated = session.clone();
        self.persist();
        Ok(updated)
    }

    /// Sessions starting inside `bounds`, newest first, joined with their owner.
    pub fn window(&self, bounds: Bounds) -> Vec<WindowEntry> {
        let mut entries: Vec<WindowEntry> = self
            .data
            .sessions
            .iter()
            .filter(|s| bounds.contains(s.start_time))
            .map(|s| WindowEntry {
                session: s.clone(),
                user: self.user(&s.owner_id).cloned().unwrap_or_else(|| User {
                    id: s.owner_id.clone(),
                    name: String::new(),
                }),
            })
            .collect();
        entries.sort_by(|a, b| b.session.start_time.cmp(&a.session.start_time));
        entries
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let result = serde_json::to_vec_pretty(&self.data)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| {
                let tmp = path.with_extension("json.tmp");
                std::fs::write(&tmp, bytes)?;
                std::fs::rename(&tmp, path)?;
                Ok(())
            });
        if let Err(e) = result {
            error!(path = %path.display(), error = %e, "failed to persist work store");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::at;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn new_work(owner: &str, description: &str, start: i64) -> NewWorkSession {
        NewWorkSession {
            owner_id: owner.to_string(),
            description: description.to_string(),
            start_time: at(start),
        }
    }

    #[test]
    fn one_running_session_per_user() {
        let mut store = WorkStore::in_memory();
        let ada = store.add_user("Ada").unwrap();

        let first = store.create(&new_work(&ada.id, "a", 1000)).unwrap();
        assert_eq!(
            store.create(&new_work(&ada.id, "b", 1001)),
            Err(StoreError::AlreadyRunning(first.id.clone()))
        );

        store
            .update(&first.id, &SessionPatch::complete("a", at(1100)))
            .unwrap();
        assert!(store.create(&new_work(&ada.id, "b", 1200)).is_ok());
    }

    #[test]
    fn rejects_invalid_mutations() {
        let mut store = WorkStore::in_memory();
        let ada = store.add_user("Ada").unwrap();

        assert_eq!(
            store.create(&new_work("ghost", "x", 0)),
            Err(StoreError::UnknownOwner("ghost".into()))
        );
        assert_eq!(
            store.create(&new_work(&ada.id, "  ", 0)),
            Err(StoreError::EmptyDescription)
        );

        let work = store.create(&new_work(&ada.id, "x", 1000)).unwrap();
        assert_eq!(
            store.update(&work.id, &SessionPatch::complete("x", at(999))),
            Err(StoreError::StopBeforeStart)
        );
        store
            .update(&work.id, &SessionPatch::complete("x", at(1000)))
            .unwrap();
        assert_eq!(
            store.update(&work.id, &SessionPatch::complete("x", at(2000))),
            Err(StoreError::AlreadyStopped(work.id.clone()))
        );
        assert_eq!(store.add_user(" "), Err(StoreError::EmptyName));
    }

    #[test]
    fn cards_prefer_the_running_session() {
        let mut store = WorkStore::in_memory();
        let ada = store.add_user("Ada").unwrap();
        let grace = store.add_user("Grace").unwrap();

        let done = store.create(&new_work(&ada.id, "old", 1000)).unwrap();
        store
            .update(&done.id, &SessionPatch::complete("old", at(1100)))
            .unwrap();
        let running = store.create(&new_work(&ada.id, "new", 500)).unwrap();

        let cards = store.cards();
        assert_eq!(cards[0].last_work.as_ref().map(|w| &w.id), Some(&running.id));
        assert!(cards[1].last_work.is_none());
        assert_eq!(cards[1].id, grace.id);
    }

    #[test]
    fn window_filters_by_start_and_sorts_newest_first() {
        let mut store = WorkStore::in_memory();
        let ada = store.add_user("Ada").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();

        let yesterday = now - Duration::days(1);
        let morning = Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2024, 1, 10, 11, 0, 0).unwrap();
        for (i, start) in [yesterday, morning, noon].into_iter().enumerate() {
            let work = store
                .create(&NewWorkSession {
                    owner_id: ada.id.clone(),
                    description: format!("task {i}"),
                    start_time: start,
                })
                .unwrap();
            store
                .update(
                    &work.id,
                    &SessionPatch::complete(format!("task {i}"), start + Duration::minutes(30)),
                )
                .unwrap();
        }

        let today = store.window(Bounds::today(now));
        assert_eq!(today.len(), 2);
        assert_eq!(today[0].session.description, "task 2");
        assert_eq!(today[1].session.description, "task 1");
        assert_eq!(today[0].user.name, "Ada");

        assert_eq!(store.window(Bounds::last_week(now)).len(), 3);

        let range = Bounds::range(
            NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10),
        );
        assert_eq!(store.window(range).len(), 1);
    }

    #[test]
    fn month_window_uses_calendar_months() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let bounds = Bounds::last_month(now);
        // Feb has no 31st; chrono clamps to the last day of the month.
        assert_eq!(bounds.from, Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap());
        assert!(bounds.contains(now));
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("work.json");

        let mut store = WorkStore::open(&path).unwrap();
        let ada = store.add_user("Ada").unwrap();
        store.create(&new_work(&ada.id, "x", 1000)).unwrap();

        let reopened = WorkStore::open(&path).unwrap();
        assert_eq!(reopened.users(), &[ada]);
        assert!(reopened.cards()[0].current_work().is_some());
    }
}
