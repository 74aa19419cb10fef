//! Per-card session engine.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::state::{FieldError, SessionState};
use crate::client::WorkService;
use crate::clock::Clock;
use crate::elapsed::{elapsed_between, elapsed_seconds};
use crate::error::{Error, Result};
use crate::models::{Card, NewWorkSession, SessionPatch, WorkSession};
use crate::timer::TimerDisplay;

/// One card's view of its work session: Idle → Running → Stopped.
///
/// Every transition that touches the service is applied only after the
/// service acknowledges it, and the acknowledged record replaces the local
/// copy. A failed call leaves the card exactly as it was.
#[derive(Debug, Clone)]
pub struct CardSession {
    card: Card,
    state: SessionState,
    /// Local, optimistic description; sent with start and complete.
    draft: String,
    field_error: Option<FieldError>,
    timer: TimerDisplay,
    /// Local clock reading when the display started ticking.
    ticking_since: Option<DateTime<Utc>>,
}

impl CardSession {
    /// Derive the initial state from the card's last known session.
    pub fn load(card: Card, now: DateTime<Utc>) -> Self {
        let (state, draft, timer) = match card.last_work.as_ref() {
            Some(work) if work.is_running() => (
                SessionState::Running,
                work.description.clone(),
                TimerDisplay::resumed(work.elapsed_seconds(now)),
            ),
            Some(work) => (
                SessionState::Stopped,
                work.description.clone(),
                TimerDisplay::frozen(work.elapsed_seconds(now)),
            ),
            None => (SessionState::Idle, String::new(), TimerDisplay::default()),
        };

        // A reload re-anchors the display on the server's start time.
        let ticking_since = card
            .last_work
            .as_ref()
            .filter(|w| w.is_running())
            .map(|w| w.start_time);

        Self {
            card,
            state,
            draft,
            field_error: None,
            timer,
            ticking_since,
        }
    }

    pub const fn card(&self) -> &Card {
        &self.card
    }

    /// The owner's name, or "No Name" when it is blank.
    pub fn display_name(&self) -> &str {
        let name = self.card.name.trim();
        if name.is_empty() {
            "No Name"
        } else {
            name
        }
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub fn description(&self) -> &str {
        &self.draft
    }

    pub const fn field_error(&self) -> Option<FieldError> {
        self.field_error
    }

    /// Start or complete was refused because the description was empty.
    pub fn validation_failed(&self) -> bool {
        self.field_error == Some(FieldError::EmptyDescription)
    }

    pub const fn timer(&self) -> &TimerDisplay {
        &self.timer
    }

    /// The session this card is showing: running, or the one just stopped.
    pub fn session(&self) -> Option<&WorkSession> {
        match self.state {
            SessionState::Idle => None,
            SessionState::Running | SessionState::Stopped => self.card.last_work.as_ref(),
        }
    }

    /// Authoritative elapsed time, derived from the session's timestamps.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        elapsed_seconds(self.session(), now)
    }

    /// Advance the display by one second. No-op unless running.
    pub fn tick(&mut self) -> u64 {
        self.timer.tick()
    }

    /// Change the local description.
    ///
    /// Refused once the session has stopped: the text is ignored and the
    /// field is flagged.
    pub fn edit_description(&mut self, text: impl Into<String>) -> Result<()> {
        if !self.state.accepts_edits() {
            self.field_error = Some(FieldError::Locked);
            return Err(Error::DescriptionLocked);
        }

        self.draft = text.into();
        if self.field_error.is_some() && !self.draft.trim().is_empty() {
            self.field_error = None;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.draft.trim().is_empty() {
            self.field_error = Some(FieldError::EmptyDescription);
            return Err(Error::EmptyDescription);
        }
        self.field_error = None;
        Ok(())
    }

    fn require(&self, action: &'static str, state: SessionState) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    /// Idle → Running.
    ///
    /// Creates the session on the service with `start_time = now`. The display
    /// starts from zero once the service acknowledges, so it trails the
    /// recorded start by the request's round trip.
    pub async fn start<S, C>(&mut self, service: &S, clock: &C) -> Result<&WorkSession>
    where
        S: WorkService,
        C: Clock,
    {
        self.require("start", SessionState::Idle)?;
        self.validate()?;

        let request = NewWorkSession {
            owner_id: self.card.id.clone(),
            description: self.draft.clone(),
            start_time: clock.now(),
        };

        let created = match service.create_session(&request).await {
            Ok(created) => created,
            Err(e) => {
                warn!(card = %self.card.id, error = %e, "start failed, staying idle");
                return Err(e);
            }
        };

        if !created.is_running() {
            return Err(Error::MalformedResponse(format!(
                "session {} was created already stopped",
                created.id
            )));
        }

        info!(card = %self.card.id, session = %created.id, "work started");
        self.draft = created.description.clone();
        self.state = SessionState::Running;
        self.timer.start();
        self.ticking_since = Some(clock.now());

        Ok(self.card.last_work.insert(created))
    }

    /// Running → Stopped.
    ///
    /// Sends the final description with `stop_time = now`. Returns the
    /// authoritative elapsed seconds of the stopped session.
    pub async fn complete<S, C>(&mut self, service: &S, clock: &C) -> Result<u64>
    where
        S: WorkService,
        C: Clock,
    {
        self.require("complete", SessionState::Running)?;
        self.validate()?;

        let Some(current) = self.card.last_work.as_ref() else {
            return Err(Error::InvalidTransition {
                action: "complete",
                state: SessionState::Idle,
            });
        };

        // stop_time >= start_time even if the local clock trails the service's.
        let stop_time = clock.now().max(current.start_time);
        let patch = SessionPatch::complete(self.draft.clone(), stop_time);

        let updated = match service.update_session(&current.id, &patch).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(card = %self.card.id, error = %e, "complete failed, still running");
                return Err(e);
            }
        };

        let Some(stopped_at) = updated.stop_time else {
            return Err(Error::MalformedResponse(format!(
                "session {} was not stopped by the update",
                updated.id
            )));
        };
        if stopped_at < updated.start_time {
            return Err(Error::MalformedResponse(format!(
                "session {} stops before it starts",
                updated.id
            )));
        }

        let elapsed = updated.elapsed_seconds(stopped_at);
        if let Some(ticked) = self.timer.stop() {
            if ticked != elapsed {
                let local = elapsed_between(self.ticking_since, None, clock.now());
                debug!(
                    card = %self.card.id,
                    ticked,
                    local,
                    elapsed,
                    "display diverged from recorded duration"
                );
            }
        }

        info!(card = %self.card.id, session = %updated.id, elapsed, "work completed");
        self.draft = updated.description.clone();
        self.card.last_work = Some(updated);
        self.state = SessionState::Stopped;
        self.timer.freeze(elapsed);
        self.ticking_since = None;

        Ok(elapsed)
    }

    /// Push a description edit to the running session without stopping it.
    pub async fn save_description<S: WorkService>(&mut self, service: &S) -> Result<()> {
        self.require("describe", SessionState::Running)?;
        self.validate()?;

        let Some(current) = self.card.last_work.as_ref() else {
            return Ok(());
        };
        let updated = service
            .update_session(&current.id, &SessionPatch::describe(self.draft.clone()))
            .await?;

        self.draft = updated.description.clone();
        self.card.last_work = Some(updated);
        Ok(())
    }

    /// Stopped → Idle, clearing the description so a new session can begin.
    pub fn reset(&mut self) -> Result<()> {
        match self.state {
            SessionState::Running => Err(Error::InvalidTransition {
                action: "reset",
                state: self.state,
            }),
            SessionState::Idle | SessionState::Stopped => {
                self.state = SessionState::Idle;
                self.draft.clear();
                self.field_error = None;
                self.timer = TimerDisplay::default();
                self.ticking_since = None;
                Ok(())
            }
        }
    }
}
