//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use reqwest::StatusCode;

use crate::client::WorkService;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{Card, HistoryEntry, HistoryWindow, NewWorkSession, SessionPatch, WorkSession};

/// Timestamp `secs` seconds after the epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// A clock the test moves by hand.
#[derive(Debug)]
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(secs: i64) -> Self {
        Self(Mutex::new(at(secs)))
    }

    pub fn set(&self, secs: i64) {
        *self.0.lock().unwrap() = at(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// In-memory work service that can be told to fail or to answer slowly.
#[derive(Debug, Default)]
pub struct MockService {
    cards: Mutex<Vec<Card>>,
    sessions: Mutex<Vec<WorkSession>>,
    entries: Mutex<Vec<HistoryEntry>>,
    windows: Mutex<Vec<HistoryWindow>>,
    failing: AtomicBool,
    malformed: AtomicBool,
    requests: AtomicUsize,
    delay_ms: AtomicUsize,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: Vec<Card>) -> Self {
        let service = Self::new();
        *service.cards.lock().unwrap() = cards;
        service
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Answer mutations with bodies that contradict the request: created
    /// sessions come back stopped, updates come back unchanged.
    pub fn set_malformed(&self, malformed: bool) {
        self.malformed.store(malformed, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        let ms = usize::try_from(delay.as_millis()).unwrap();
        self.delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn set_entries(&self, entries: Vec<HistoryEntry>) {
        *self.entries.lock().unwrap() = entries;
    }

    /// Number of requests that reached the service.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Windows requested so far, oldest first.
    pub fn requested_windows(&self) -> Vec<HistoryWindow> {
        self.windows.lock().unwrap().clone()
    }

    async fn enter(&self, path: &str) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Status {
                url: format!("mock://{path}"),
                status: StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        Ok(())
    }
}

impl WorkService for MockService {
    async fn list_cards(&self) -> Result<Vec<Card>> {
        self.enter("cards").await?;
        Ok(self.cards.lock().unwrap().clone())
    }

    async fn create_session(&self, session: &NewWorkSession) -> Result<WorkSession> {
        self.enter("work").await?;
        let mut sessions = self.sessions.lock().unwrap();
        let created = WorkSession {
            id: format!("w{}", sessions.len() + 1),
            owner_id: session.owner_id.clone(),
            description: session.description.clone(),
            start_time: session.start_time,
            stop_time: self
                .malformed
                .load(Ordering::SeqCst)
                .then_some(session.start_time),
        };
        sessions.push(created.clone());
        Ok(created)
    }

    async fn update_session(&self, id: &str, patch: &SessionPatch) -> Result<WorkSession> {
        self.enter("work/id").await?;
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::Status {
                url: format!("mock://work/{id}"),
                status: StatusCode::NOT_FOUND,
            })?;
        if self.malformed.load(Ordering::SeqCst) {
            return Ok(session.clone());
        }
        if let Some(description) = &patch.description {
            session.description.clone_from(description);
        }
        if patch.stop_time.is_some() {
            session.stop_time = patch.stop_time;
        }
        Ok(session.clone())
    }

    async fn fetch_window(&self, window: &HistoryWindow) -> Result<Vec<HistoryEntry>> {
        self.windows.lock().unwrap().push(*window);
        self.enter(&window.endpoint()).await?;
        Ok(self.entries.lock().unwrap().clone())
    }
}
