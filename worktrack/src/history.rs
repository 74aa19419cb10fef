//! History aggregator and the history view's refetch policy.
//!
//! Filtering by window is the service's job. The aggregator keeps what the
//! service returns, in the order returned, and annotates each row with its
//! elapsed time. Every open or window change fetches again; previous windows
//! are never reused except as an offline fallback.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::LocalCache;
use crate::client::WorkService;
use crate::clock::Clock;
use crate::error::Result;
use crate::models::{HistoryBucket, HistoryWindow};
use crate::notify::{Notifier, Severity};

/// Fetches and renders history buckets.
pub struct HistoryAggregator<S, C> {
    service: S,
    clock: C,
    cache: Option<LocalCache>,
}

impl<S: WorkService, C: Clock> HistoryAggregator<S, C> {
    pub const fn new(service: S, clock: C, cache: Option<LocalCache>) -> Self {
        Self {
            service,
            clock,
            cache,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Fetch the sessions of `window`.
    ///
    /// If the service is unreachable and the last bucket for this exact
    /// window is cached, that bucket is returned marked stale.
    pub async fn fetch_history(&self, window: HistoryWindow) -> Result<HistoryBucket> {
        match self.service.fetch_window(&window).await {
            Ok(entries) => {
                let bucket = HistoryBucket::from_entries(window, &entries, self.clock.now());
                debug!(window = %window, rows = bucket.len(), "history fetched");
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.store_history(&bucket) {
                        warn!(error = %e, "failed to cache history");
                    }
                }
                Ok(bucket)
            }
            Err(e) if e.is_transport() => {
                let cached = self
                    .cache
                    .as_ref()
                    .map(|c| c.load_history(&window))
                    .transpose()?
                    .flatten();
                match cached {
                    Some(mut bucket) => {
                        warn!(window = %window, error = %e, "serving cached history");
                        bucket.stale = true;
                        bucket.refresh(self.clock.now());
                        Ok(bucket)
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}

/// The history popup: which window is selected and what it currently shows.
pub struct HistoryView<S, C> {
    aggregator: HistoryAggregator<S, C>,
    notifier: Arc<dyn Notifier>,
    open: bool,
    selected: HistoryWindow,
    bucket: Option<HistoryBucket>,
}

impl<S: WorkService, C: Clock> HistoryView<S, C> {
    pub fn new(aggregator: HistoryAggregator<S, C>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            aggregator,
            notifier,
            open: false,
            selected: HistoryWindow::Daily,
            bucket: None,
        }
    }

    pub const fn is_open(&self) -> bool {
        self.open
    }

    pub const fn selected(&self) -> HistoryWindow {
        self.selected
    }

    pub const fn bucket(&self) -> Option<&HistoryBucket> {
        self.bucket.as_ref()
    }

    /// Open the view and fetch the selected window.
    pub async fn open(&mut self) -> Option<&HistoryBucket> {
        self.open = true;
        self.reload().await
    }

    /// Select a window; fetches immediately if the view is open.
    pub async fn select(&mut self, window: HistoryWindow) -> Option<&HistoryBucket> {
        self.selected = window;
        if !self.open {
            return None;
        }
        self.reload().await
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Keep running rows ticking.
    pub fn refresh(&mut self) {
        let now = self.aggregator.now();
        if let Some(bucket) = self.bucket.as_mut() {
            bucket.refresh(now);
        }
    }

    async fn reload(&mut self) -> Option<&HistoryBucket> {
        // drop the previous window's rows before the new ones arrive
        self.bucket = None;

        match self.aggregator.fetch_history(self.selected).await {
            Ok(bucket) => {
                if bucket.stale {
                    self.notifier.notify(
                        "Work service unreachable, showing cached history",
                        Severity::Error,
                    );
                }
                self.bucket = Some(bucket);
            }
            Err(e) => {
                self.notifier
                    .notify(&format!("Error fetching work history: {e}"), Severity::Error);
            }
        }
        self.bucket.as_ref()
    }
}
