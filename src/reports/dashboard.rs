use super::{rank_against, RankedRow, ReportError, StatsService};
use crate::listening::{
    DailyPlaytime, ListeningStatsStore, ListeningTotals, TopAlbum, TopArtist, TopTrack,
    UserIdentityStore, UserProfile,
};
use crate::stats::{percent_change, PeriodWindow};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DashboardQuery {
    /// Whose dashboard, the viewer's own when absent
    pub user_id: Option<usize>,
    /// First day, `YYYY-MM-DD`. Anything unparseable is rejected rather than
    /// replaced by the default.
    pub from: Option<String>,
    /// Last day, inclusive, same format as `from`.
    pub to: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsSummary {
    pub minutes: f64,
    pub minutes_change: f64,
    pub distinct_tracks: u64,
    pub distinct_tracks_change: f64,
    pub distinct_artists: u64,
    pub distinct_artists_change: f64,
}

impl TotalsSummary {
    fn between(current: &ListeningTotals, previous: &ListeningTotals) -> Self {
        Self {
            minutes: current.minutes(),
            minutes_change: percent_change(current.minutes(), previous.minutes()),
            distinct_tracks: current.distinct_tracks,
            distinct_tracks_change: percent_change(
                current.distinct_tracks as f64,
                previous.distinct_tracks as f64,
            ),
            distinct_artists: current.distinct_artists,
            distinct_artists_change: percent_change(
                current.distinct_artists as f64,
                previous.distinct_artists as f64,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub user: UserProfile,
    pub window: PeriodWindow,
    pub previous_window: PeriodWindow,
    /// Whether the user has listened to anything at all, in any window.
    pub has_data: bool,
    pub totals: TotalsSummary,
    pub top_artists: Vec<RankedRow<TopArtist>>,
    pub top_tracks: Vec<RankedRow<TopTrack>>,
    pub top_albums: Vec<RankedRow<TopAlbum>>,
    pub daily_playtime: Vec<DailyPlaytime>,
}

fn parse_date(raw: &str) -> Result<NaiveDate, ReportError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| ReportError::InvalidDate(raw.to_string()))
}

impl StatsService {
    /// Resolves the calendar days a dashboard covers.
    ///
    /// Without an explicit start, the window reaches back `default_window_days`
    /// from its end but never before the user's first play.
    fn resolve_dashboard_window(
        &self,
        query: &DashboardQuery,
        first_listen: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<PeriodWindow, ReportError> {
        let to = match query.to.as_deref() {
            Some(raw) => parse_date(raw)?,
            None => today,
        };
        let from = match query.from.as_deref() {
            Some(raw) => parse_date(raw)?,
            None => {
                let fallback = to
                    .checked_sub_signed(Duration::days(self.settings.default_window_days))
                    .unwrap_or(NaiveDate::MIN);
                match first_listen {
                    Some(first) => first.max(fallback).min(to),
                    None => fallback,
                }
            }
        };
        if from > to {
            return Err(ReportError::InvalidWindow { from, to });
        }
        PeriodWindow::for_days(from, to).ok_or_else(|| ReportError::InvalidDate(to.to_string()))
    }

    pub fn dashboard(
        &self,
        viewer_id: usize,
        query: &DashboardQuery,
        now: DateTime<Utc>,
    ) -> Result<Dashboard, ReportError> {
        let user_id = query.user_id.unwrap_or(viewer_id);
        self.check_access(viewer_id, user_id)?;
        let user = self
            .store
            .get_user(user_id)?
            .ok_or(ReportError::UserNotFound(user_id))?;

        let first_listen = self
            .store
            .get_first_listen_at(user_id)?
            .map(|first| first.date_naive());
        let window = self.resolve_dashboard_window(query, first_listen, now.date_naive())?;
        let previous_window = window.previous();
        let limit = self.settings.clamp_limit(query.limit);
        let previous_limit = self.previous_limit(limit);
        let min_listen_ms = self.settings.min_listen_ms;
        debug!(
            "Dashboard of user {} for {:?}, previous {:?}",
            user_id, window, previous_window
        );

        let top_artists = rank_against(
            "artist",
            self.store
                .get_top_artists(user_id, &window, min_listen_ms, limit)?,
            &self
                .store
                .get_top_artists(user_id, &previous_window, min_listen_ms, previous_limit)?,
        );
        let top_tracks = rank_against(
            "track",
            self.store
                .get_top_tracks(user_id, &window, min_listen_ms, limit)?,
            &self
                .store
                .get_top_tracks(user_id, &previous_window, min_listen_ms, previous_limit)?,
        );
        let top_albums = rank_against(
            "album",
            self.store
                .get_top_albums(user_id, &window, min_listen_ms, limit)?,
            &self
                .store
                .get_top_albums(user_id, &previous_window, min_listen_ms, previous_limit)?,
        );

        let current_totals = self
            .store
            .get_listening_totals(user_id, &window, min_listen_ms)?;
        let previous_totals =
            self.store
                .get_listening_totals(user_id, &previous_window, min_listen_ms)?;
        let daily_playtime = self.store.get_daily_playtime(user_id, &window)?;

        Ok(Dashboard {
            user,
            window,
            previous_window,
            has_data: first_listen.is_some(),
            totals: TotalsSummary::between(&current_totals, &previous_totals),
            top_artists,
            top_tracks,
            top_albums,
            daily_playtime,
        })
    }
}
