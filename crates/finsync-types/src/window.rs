//! Reporting windows for dashboard aggregates.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WindowError;

/// Granularity of a dashboard window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(WindowError::UnknownPeriod(other.to_string())),
        }
    }
}

/// A concrete reporting window.
///
/// Calendar windows are evaluated in UTC. The week window trails the
/// evaluation instant, so it has no fixed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "period", rename_all = "lowercase")]
pub enum ReportWindow {
    /// The seven days ending at the evaluation instant.
    Week,
    /// A calendar month.
    Month { year: i32, month: u32 },
    /// A calendar year.
    Year { year: i32 },
}

impl ReportWindow {
    /// Build a window from a period and a `YYYY-MM` (or `YYYY` for years) key.
    ///
    /// The key is ignored for weeks.
    pub fn parse(period: Period, key: &str) -> Result<Self, WindowError> {
        let invalid = || WindowError::InvalidKey {
            period: period.to_string(),
            key: key.to_string(),
        };

        match period {
            Period::Week => Ok(ReportWindow::Week),
            Period::Month => {
                let (year, month) = key.trim().split_once('-').ok_or_else(invalid)?;
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let month: u32 = month.parse().map_err(|_| invalid())?;
                NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
                Ok(ReportWindow::Month { year, month })
            }
            Period::Year => {
                let year = key.trim().split('-').next().unwrap_or_default();
                let year: i32 = year.parse().map_err(|_| invalid())?;
                NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
                Ok(ReportWindow::Year { year })
            }
        }
    }

    /// The window of `period` containing `now`.
    pub fn current(period: Period, now: DateTime<Utc>) -> Self {
        match period {
            Period::Week => ReportWindow::Week,
            Period::Month => ReportWindow::Month {
                year: now.year(),
                month: now.month(),
            },
            Period::Year => ReportWindow::Year { year: now.year() },
        }
    }

    pub fn period(&self) -> Period {
        match self {
            ReportWindow::Week => Period::Week,
            ReportWindow::Month { .. } => Period::Month,
            ReportWindow::Year { .. } => Period::Year,
        }
    }

    /// Cache key segment identifying the window.
    pub fn key(&self) -> String {
        match self {
            ReportWindow::Week => "trailing".to_string(),
            ReportWindow::Month { year, month } => format!("{:04}-{:02}", year, month),
            ReportWindow::Year { year } => format!("{:04}", year),
        }
    }

    /// Start and inclusive end of the window.
    ///
    /// The end of a calendar window is the last representable instant before
    /// the next period starts.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match *self {
            ReportWindow::Week => (now - Duration::days(7), now),
            ReportWindow::Month { year, month } => {
                let (next_year, next_month) = if month == 12 {
                    (year + 1, 1)
                } else {
                    (year, month + 1)
                };
                (
                    start_of(year, month),
                    start_of(next_year, next_month) - Duration::nanoseconds(1),
                )
            }
            ReportWindow::Year { year } => (
                start_of(year, 1),
                start_of(year + 1, 1) - Duration::nanoseconds(1),
            ),
        }
    }

    /// Whether an instant lies inside the window.
    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let (start, end) = self.bounds(now);
        at >= start && at <= end
    }
}

impl std::fmt::Display for ReportWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.period(), self.key())
    }
}

fn start_of(year: i32, month: u32) -> DateTime<Utc> {
    // Months produced by `parse` and `current` are always valid, so the
    // fallback only guards hand-built windows with out-of-range fields.
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn test_parse_month() {
        let window = ReportWindow::parse(Period::Month, "2025-03").unwrap();
        assert_eq!(window, ReportWindow::Month { year: 2025, month: 3 });
        assert_eq!(window.key(), "2025-03");
    }

    #[test]
    fn test_parse_rejects_bad_keys() {
        assert!(ReportWindow::parse(Period::Month, "2025").is_err());
        assert!(ReportWindow::parse(Period::Month, "2025-13").is_err());
        assert!(ReportWindow::parse(Period::Year, "twenty").is_err());
        assert!("decade".parse::<Period>().is_err());
    }

    #[test]
    fn test_year_accepts_month_key() {
        let window = ReportWindow::parse(Period::Year, "2024-07").unwrap();
        assert_eq!(window, ReportWindow::Year { year: 2024 });
    }

    #[test]
    fn test_month_end_is_inclusive() {
        let now = utc(2025, 6, 1, 0, 0, 0);
        let window = ReportWindow::Month { year: 2025, month: 3 };
        assert!(window.contains(utc(2025, 3, 1, 0, 0, 0), now));
        assert!(window.contains(utc(2025, 3, 31, 23, 59, 59), now));
        assert!(!window.contains(utc(2025, 4, 1, 0, 0, 0), now));
        assert!(!window.contains(utc(2025, 2, 28, 23, 59, 59), now));
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let window = ReportWindow::Month { year: 2024, month: 12 };
        let (_, end) = window.bounds(Utc::now());
        assert_eq!(end + Duration::nanoseconds(1), utc(2025, 1, 1, 0, 0, 0));
    }

    #[test]
    fn test_week_trails_now() {
        let now = utc(2025, 3, 15, 12, 0, 0);
        let window = ReportWindow::Week;
        assert!(window.contains(utc(2025, 3, 8, 12, 0, 0), now));
        assert!(!window.contains(utc(2025, 3, 8, 11, 59, 59), now));
        assert!(!window.contains(utc(2025, 3, 15, 12, 0, 1), now));
        assert_eq!(window.key(), "trailing");
    }
}
