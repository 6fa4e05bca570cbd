use super::models::{
    DailyPlaytime, LeaderboardEntry, LeaderboardMetric, ListeningTotals, RecentListen, TopAlbum,
    TopArtist, TopTrack, UserProfile,
};
use crate::stats::PeriodWindow;
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Ranked aggregations over play events.
///
/// Every ranked query returns rows ordered by metric descending, then summed
/// listening progress descending, then display name ascending, and ignores
/// plays shorter than `min_listen_ms` when counting.
pub trait ListeningStatsStore: Send + Sync {
    fn get_top_artists(
        &self,
        user_id: usize,
        window: &PeriodWindow,
        min_listen_ms: u64,
        limit: usize,
    ) -> Result<Vec<TopArtist>>;

    fn get_top_tracks(
        &self,
        user_id: usize,
        window: &PeriodWindow,
        min_listen_ms: u64,
        limit: usize,
    ) -> Result<Vec<TopTrack>>;

    fn get_top_albums(
        &self,
        user_id: usize,
        window: &PeriodWindow,
        min_listen_ms: u64,
        limit: usize,
    ) -> Result<Vec<TopAlbum>>;

    /// Number of users among `user_ids` with at least one counted play.
    /// A `None` window means all time.
    fn count_leaderboard_users(
        &self,
        user_ids: &[usize],
        window: Option<&PeriodWindow>,
        metric: LeaderboardMetric,
        min_listen_ms: u64,
    ) -> Result<usize>;

    fn get_leaderboard(
        &self,
        user_ids: &[usize],
        window: Option<&PeriodWindow>,
        metric: LeaderboardMetric,
        min_listen_ms: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LeaderboardEntry>>;

    /// Listening time counts every play, distinct counts only qualifying ones.
    fn get_listening_totals(
        &self,
        user_id: usize,
        window: &PeriodWindow,
        min_listen_ms: u64,
    ) -> Result<ListeningTotals>;

    /// One entry per UTC day with any listening, oldest first.
    fn get_daily_playtime(&self, user_id: usize, window: &PeriodWindow)
        -> Result<Vec<DailyPlaytime>>;

    /// Newest first.
    fn get_recent_listens(
        &self,
        user_ids: &[usize],
        since: DateTime<Utc>,
        min_listen_ms: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RecentListen>>;

    fn get_first_listen_at(&self, user_id: usize) -> Result<Option<DateTime<Utc>>>;
}

/// Read-only view of the friends graph.
pub trait SocialGraphStore: Send + Sync {
    /// Users with an accepted friendship with `user_id`, in either direction.
    fn get_friend_ids(&self, user_id: usize) -> Result<Vec<usize>>;

    fn are_friends(&self, user_id: usize, other_id: usize) -> Result<bool>;
}

pub trait UserIdentityStore: Send + Sync {
    fn get_user(&self, user_id: usize) -> Result<Option<UserProfile>>;

    /// Resolves a session token, refreshing its last-used time.
    fn get_user_id_for_token(&self, token: &str) -> Result<Option<usize>>;
}

/// Combined trait for everything the stats reports read.
pub trait FullStatsStore: ListeningStatsStore + SocialGraphStore + UserIdentityStore {}

impl<T: ListeningStatsStore + SocialGraphStore + UserIdentityStore> FullStatsStore for T {}
