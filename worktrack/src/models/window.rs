//! History windows: the named and custom time ranges used to filter sessions.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A time window selected for history display.
///
/// Boundaries of the named windows are the service's responsibility; the
/// client only names the window. A custom range is `[start, end)` by date,
/// and an absent `end` means "through now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum HistoryWindow {
    Daily,
    Weekly,
    Monthly,
    Custom {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
}

impl HistoryWindow {
    /// Short label, also used as the cache key for the window's last bucket.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Custom { .. } => "custom",
        }
    }

    /// Service path (relative to the base URL) that returns this window.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Daily => "work/today".to_string(),
            Self::Weekly => "work/lastweek".to_string(),
            Self::Monthly => "work/lastmonth".to_string(),
            Self::Custom { start, end } => {
                let start = start.format("%Y-%m-%d").to_string();
                let mut path = format!("work/range?start={}", urlencoding::encode(&start));
                if let Some(end) = end {
                    let end = end.format("%Y-%m-%d").to_string();
                    path.push_str(&format!("&end={}", urlencoding::encode(&end)));
                }
                path
            }
        }
    }

    /// Build a custom window from user-entered date strings.
    ///
    /// `start` is required. A blank or missing `end` means "through now".
    pub fn custom(start: &str, end: Option<&str>) -> Result<Self> {
        let start = parse_date(start)?;
        let end = match end.map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(parse_date(s)?),
        };

        if let Some(end) = end {
            if end <= start {
                return Err(Error::InvalidRange(format!(
                    "end {end} must be after start {start}"
                )));
            }
        }

        Ok(Self::Custom { start, end })
    }
}

impl fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom {
                start,
                end: Some(end),
            } => write!(f, "{start} to {end}"),
            Self::Custom { start, end: None } => write!(f, "{start} to now"),
            other => f.write_str(other.label()),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidRange("start date is required".to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::InvalidRange(format!("'{s}' is not a YYYY-MM-DD date")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_windows_map_to_service_paths() {
        assert_eq!(HistoryWindow::Daily.endpoint(), "work/today");
        assert_eq!(HistoryWindow::Weekly.endpoint(), "work/lastweek");
        assert_eq!(HistoryWindow::Monthly.endpoint(), "work/lastmonth");
    }

    #[test]
    fn custom_range_with_both_ends() {
        let window = HistoryWindow::custom("2024-01-01", Some("2024-01-08")).unwrap();
        assert_eq!(
            window.endpoint(),
            "work/range?start=2024-01-01&end=2024-01-08"
        );
        assert_eq!(window.to_string(), "2024-01-01 to 2024-01-08");
    }

    #[test]
    fn custom_range_without_end_runs_through_now() {
        let window = HistoryWindow::custom("2024-01-01", Some("  ")).unwrap();
        assert_eq!(
            window,
            HistoryWindow::Custom {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: None
            }
        );
        assert_eq!(window.endpoint(), "work/range?start=2024-01-01");
        assert_eq!(window.to_string(), "2024-01-01 to now");
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!(matches!(
            HistoryWindow::custom("", None),
            Err(Error::InvalidRange(_))
        ));
        assert!(HistoryWindow::custom("01/01/2024", None).is_err());
        assert!(HistoryWindow::custom("2024-01-08", Some("2024-01-01")).is_err());
    }
}
