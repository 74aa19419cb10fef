//! Remote persistence service.
//!
//! [`WorkService`] is the seam between the engine and the outside world; the
//! HTTP implementation talks JSON to the work API.

mod http;

pub use http::HttpWorkService;

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Card, HistoryEntry, HistoryWindow, NewWorkSession, SessionPatch, WorkSession};

/// Operations the remote work service offers.
#[allow(async_fn_in_trait)]
pub trait WorkService {
    /// List every user card with its last known session.
    async fn list_cards(&self) -> Result<Vec<Card>>;

    /// Create a running session. The service assigns the id.
    async fn create_session(&self, session: &NewWorkSession) -> Result<WorkSession>;

    /// Update a session's description and/or stop time.
    async fn update_session(&self, id: &str, patch: &SessionPatch) -> Result<WorkSession>;

    /// Fetch the sessions whose start falls inside `window`, in service order.
    async fn fetch_window(&self, window: &HistoryWindow) -> Result<Vec<HistoryEntry>>;
}

impl<S: WorkService + ?Sized> WorkService for Arc<S> {
    async fn list_cards(&self) -> Result<Vec<Card>> {
        (**self).list_cards().await
    }

    async fn create_session(&self, session: &NewWorkSession) -> Result<WorkSession> {
        (**self).create_session(session).await
    }

    async fn update_session(&self, id: &str, patch: &SessionPatch) -> Result<WorkSession> {
        (**self).update_session(id, patch).await
    }

    async fn fetch_window(&self, window: &HistoryWindow) -> Result<Vec<HistoryEntry>> {
        (**self).fetch_window(window).await
    }
}
