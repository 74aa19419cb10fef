//! Elapsed-time derivation shared by the live card display and history views.
//!
//! The running session and the completed session must report the same value
//! at the boundary instant, so both go through [`elapsed_between`].

use chrono::{DateTime, Utc};

use crate::models::WorkSession;

/// Whole seconds from `start` to `stop`, or to `now` while running.
///
/// Returns 0 when there is no start, and never goes negative when `now`
/// lags behind a server-recorded start.
pub fn elapsed_between(
    start: Option<DateTime<Utc>>,
    stop: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> u64 {
    let Some(start) = start else {
        return 0;
    };
    let end = stop.unwrap_or(now);
    u64::try_from((end - start).num_seconds()).unwrap_or(0)
}

/// Elapsed seconds of an optional session; a card that never started reports 0.
pub fn elapsed_seconds(session: Option<&WorkSession>, now: DateTime<Utc>) -> u64 {
    session.map_or(0, |s| elapsed_between(Some(s.start_time), s.stop_time, now))
}

/// Render seconds as `H:MM:SS`.
pub fn format_hms(seconds: u64) -> String {
    let hrs = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hrs}:{mins:02}:{secs:02}")
}
