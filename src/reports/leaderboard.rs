use super::{rank_against, RankedRow, ReportError, StatsService};
use crate::listening::{LeaderboardEntry, LeaderboardMetric, ListeningStatsStore};
use crate::stats::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub metric: LeaderboardMetric,
    #[serde(default)]
    pub timeframe: Timeframe,
    /// 1-based
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardPage {
    pub metric: LeaderboardMetric,
    pub timeframe: Timeframe,
    pub entries: Vec<RankedRow<LeaderboardEntry>>,
    pub current_page: usize,
    pub total_pages: usize,
}

impl StatsService {
    /// Ranks the viewer and their friends.
    ///
    /// Ranks are positions in the whole leaderboard, so every page compares
    /// the full list down to its last row against the previous period.
    pub fn leaderboard(
        &self,
        viewer_id: usize,
        query: &LeaderboardQuery,
        now: DateTime<Utc>,
    ) -> Result<LeaderboardPage, ReportError> {
        let user_ids = self.circle_of(viewer_id)?;
        let window = query.timeframe.window_ending_at(now);
        let min_listen_ms = self.settings.min_listen_ms;
        let limit = self.settings.clamp_limit(query.limit);

        let ranked_users = self.store.count_leaderboard_users(
            &user_ids,
            window.as_ref(),
            query.metric,
            min_listen_ms,
        )?;
        let total_pages = ranked_users.div_ceil(limit);
        let current_page = query.page.unwrap_or(1).clamp(1, total_pages.max(1));
        let offset = (current_page - 1) * limit;
        let needed = offset + limit;

        let current = self.store.get_leaderboard(
            &user_ids,
            window.as_ref(),
            query.metric,
            min_listen_ms,
            needed,
            0,
        )?;
        let previous = match &window {
            Some(window) => self.store.get_leaderboard(
                &user_ids,
                Some(&window.previous()),
                query.metric,
                min_listen_ms,
                self.previous_limit(needed),
                0,
            )?,
            None => Vec::new(),
        };
        debug!(
            "Leaderboard of {} users for user {}, page {}/{}",
            ranked_users, viewer_id, current_page, total_pages
        );

        let entries = rank_against("user", current, &previous)
            .into_iter()
            .skip(offset)
            .collect();

        Ok(LeaderboardPage {
            metric: query.metric,
            timeframe: query.timeframe,
            entries,
            current_page,
            total_pages,
        })
    }
}
