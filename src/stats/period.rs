//! Time windows used to aggregate listening activity.
//!
//! A [`PeriodWindow`] is half-open, `[from, to)`. The previous window of a
//! period has the same duration and ends exactly where the current one
//! starts, so consecutive windows never share a play.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl PeriodWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Window of `span` length that ends at `now`.
    pub fn ending_at(now: DateTime<Utc>, span: Duration) -> Self {
        Self {
            from: now.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC),
            to: now,
        }
    }

    /// Window covering the calendar days `first..=last` (UTC).
    ///
    /// `to` lands on midnight of the day after `last`. `None` when that
    /// midnight is past the last representable instant.
    pub fn for_days(first: NaiveDate, last: NaiveDate) -> Option<Self> {
        let from = first.and_time(NaiveTime::MIN).and_utc();
        let to = last
            .and_time(NaiveTime::MIN)
            .and_utc()
            .checked_add_signed(Duration::days(1))?;
        Some(Self { from, to })
    }

    pub fn duration(&self) -> Duration {
        self.to - self.from
    }

    /// The window of identical duration immediately preceding this one.
    ///
    /// A zero-length window yields a zero-length window at the same instant.
    /// Near the start of time the window is cut at the earliest instant.
    pub fn previous(&self) -> PeriodWindow {
        let span = self.duration();
        PeriodWindow {
            from: self
                .from
                .checked_sub_signed(span)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            to: self.from,
        }
    }

    /// Bounds as unix milliseconds, the unit `listening_history` stores.
    pub fn as_millis(&self) -> (i64, i64) {
        (self.from.timestamp_millis(), self.to.timestamp_millis())
    }
}

/// Fixed leaderboard ranges, always ending at the time of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    #[serde(rename = "last_24_hours")]
    Last24Hours,
    #[default]
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    AllTime,
}

impl Timeframe {
    pub fn span(&self) -> Option<Duration> {
        match self {
            Timeframe::Last24Hours => Some(Duration::hours(24)),
            Timeframe::Last7Days => Some(Duration::days(7)),
            Timeframe::Last30Days => Some(Duration::days(30)),
            Timeframe::AllTime => None,
        }
    }

    /// `None` means unbounded, which has no previous period to compare with.
    pub fn window_ending_at(&self, now: DateTime<Utc>) -> Option<PeriodWindow> {
        self.span().map(|span| PeriodWindow::ending_at(now, span))
    }
}
