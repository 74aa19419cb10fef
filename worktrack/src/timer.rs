//! Passive ticking display for a running card.
//!
//! The tick counter is a presentation affordance only. It survives neither a
//! reload nor a dropped tick, so the engine never reads it back as the
//! session's duration; it only receives the counter's final value on stop.

use std::time::Duration;

use tokio::sync::watch;

use crate::elapsed::format_hms;

/// A seconds counter that advances once per tick while running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerDisplay {
    seconds: u64,
    running: bool,
}

impl TimerDisplay {
    /// A stopped display showing `seconds`.
    pub const fn frozen(seconds: u64) -> Self {
        Self {
            seconds,
            running: false,
        }
    }

    /// A running display that resumes counting from `seconds`.
    pub const fn resumed(seconds: u64) -> Self {
        Self {
            seconds,
            running: true,
        }
    }

    /// Start ticking from zero.
    pub fn start(&mut self) {
        self.seconds = 0;
        self.running = true;
    }

    /// Advance by one second if running. Returns the displayed value.
    pub fn tick(&mut self) -> u64 {
        if self.running {
            self.seconds += 1;
        }
        self.seconds
    }

    /// Stop ticking. Returns the counter value the first time only.
    pub fn stop(&mut self) -> Option<u64> {
        if !self.running {
            return None;
        }
        self.running = false;
        Some(self.seconds)
    }

    /// Stop and show `seconds` from now on.
    pub fn freeze(&mut self, seconds: u64) {
        self.running = false;
        self.seconds = seconds;
    }

    pub const fn seconds(&self) -> u64 {
        self.seconds
    }

    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// The display text, `H:MM:SS`.
    pub fn text(&self) -> String {
        format_hms(self.seconds)
    }
}

/// Drive `display` once per `period` until `stop` flips to `true` or its
/// sender goes away. `on_tick` sees every new value.
///
/// Returns the counter value reported on stop.
pub async fn run_ticker<F>(
    mut display: TimerDisplay,
    period: Duration,
    mut stop: watch::Receiver<bool>,
    mut on_tick: F,
) -> u64
where
    F: FnMut(&TimerDisplay),
{
    let mut interval = tokio::time::interval(period);
    // The first tick of a tokio interval completes immediately.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                display.tick();
                on_tick(&display);
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }

    display.stop().unwrap_or_else(|| display.seconds())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_only_while_running() {
        let mut display = TimerDisplay::frozen(42);
        assert_eq!(display.tick(), 42);

        display.start();
        display.tick();
        display.tick();
        assert_eq!(display.text(), "0:00:02");

        assert_eq!(display.stop(), Some(2));
        assert_eq!(display.stop(), None);
        assert_eq!(display.tick(), 2);
    }

    #[test]
    fn freeze_replaces_the_counter() {
        let mut display = TimerDisplay::resumed(10);
        display.tick();
        display.freeze(125);
        assert!(!display.is_running());
        assert_eq!(display.text(), "0:02:05");
    }

    #[tokio::test]
    async fn ticker_stops_when_signalled() {
        let (tx, rx) = watch::channel(false);

        let ticker = tokio::spawn(async move {
            let mut seen = Vec::new();
            let reported = run_ticker(
                TimerDisplay::resumed(0),
                Duration::from_millis(10),
                rx,
                |d| seen.push(d.seconds()),
            )
            .await;
            (reported, seen)
        });

        tokio::time::sleep(Duration::from_millis(60)).await;
        tx.send(true).unwrap();
        let (reported, seen) = ticker.await.unwrap();

        assert!(reported >= 1);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.first(), Some(&1));
        assert_eq!(seen.last(), Some(&reported));
    }

    #[tokio::test]
    async fn ticker_stops_when_sender_dropped() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let reported = run_ticker(
            TimerDisplay::resumed(7),
            Duration::from_secs(3600),
            rx,
            |_| {},
        )
        .await;
        assert_eq!(reported, 7);
    }
}
