use super::{ReportError, StatsService};
use crate::listening::{ListeningStatsStore, RecentListen};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub listens: Vec<RecentListen>,
    pub since: DateTime<Utc>,
    /// Offset of the next page, absent on the last one
    pub next_offset: Option<usize>,
}

impl StatsService {
    /// Recent plays of the viewer and their friends, newest first.
    pub fn feed(
        &self,
        viewer_id: usize,
        query: &FeedQuery,
        now: DateTime<Utc>,
    ) -> Result<FeedPage, ReportError> {
        let user_ids = self.circle_of(viewer_id)?;
        let since = now - Duration::hours(self.settings.feed_window_hours);
        let limit = self.settings.clamp_limit(query.limit);
        let offset = query.offset.unwrap_or(0);

        // one extra row tells whether another page exists
        let mut listens = self.store.get_recent_listens(
            &user_ids,
            since,
            self.settings.min_listen_ms,
            limit + 1,
            offset,
        )?;
        let next_offset = if listens.len() > limit {
            listens.truncate(limit);
            Some(offset + limit)
        } else {
            None
        };

        Ok(FeedPage {
            listens,
            since,
            next_offset,
        })
    }
}
