//! Stats reports served to users: the dashboard of one user, the friends
//! leaderboard and the friends feed.

mod dashboard;
mod feed;
mod leaderboard;

#[cfg(test)]
mod testing;

pub use dashboard::{Dashboard, DashboardQuery, TotalsSummary};
pub use feed::{FeedPage, FeedQuery};
pub use leaderboard::{LeaderboardPage, LeaderboardQuery};

use crate::config::StatsSettings;
use crate::listening::{FullStatsStore, SocialGraphStore};
use crate::server::metrics::record_comparison;
use crate::stats::{compare_ranked, describe_rank_change, Compared, RankedEntity, Trend};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Access denied")]
    AccessDenied,

    #[error("User not found: {0}")]
    UserNotFound(usize),

    #[error("Invalid date: {0} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Invalid window: {from} is after {to}")]
    InvalidWindow { from: NaiveDate, to: NaiveDate },

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// A compared row together with its absolute position and its wording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRow<T> {
    pub rank: usize,
    #[serde(flatten)]
    pub compared: Compared<T>,
    pub trend: Option<Trend>,
    pub rank_change_description: String,
}

impl<T> RankedRow<T> {
    pub fn new(rank: usize, compared: Compared<T>) -> Self {
        let trend = compared.trend();
        let rank_change_description =
            describe_rank_change(compared.rank_change, compared.previous_rank);
        Self {
            rank,
            compared,
            trend,
            rank_change_description,
        }
    }
}

/// Ranks `current` from 1 against `previous` and records the outcome.
pub(crate) fn rank_against<T: RankedEntity>(
    kind: &'static str,
    current: Vec<T>,
    previous: &[T],
) -> Vec<RankedRow<T>> {
    let compared = compare_ranked(current, previous);
    let new = compared.iter().filter(|row| row.is_new()).count();
    record_comparison(kind, compared.len() - new, new);
    compared
        .into_iter()
        .enumerate()
        .map(|(index, row)| RankedRow::new(index + 1, row))
        .collect()
}

#[derive(Clone)]
pub struct StatsService {
    store: Arc<dyn FullStatsStore>,
    settings: StatsSettings,
}

impl StatsService {
    pub fn new(store: Arc<dyn FullStatsStore>, settings: StatsSettings) -> Self {
        Self { store, settings }
    }

    /// Rows to read from the previous period when `needed` current rows are shown.
    fn previous_limit(&self, needed: usize) -> usize {
        needed.saturating_mul(self.settings.previous_fetch_factor)
    }

    /// A user can look at their own stats and at those of accepted friends.
    fn check_access(&self, viewer_id: usize, target_id: usize) -> Result<(), ReportError> {
        if viewer_id == target_id || self.store.are_friends(viewer_id, target_id)? {
            Ok(())
        } else {
            Err(ReportError::AccessDenied)
        }
    }

    /// The viewer followed by their friends.
    fn circle_of(&self, viewer_id: usize) -> Result<Vec<usize>, ReportError> {
        let mut ids = vec![viewer_id];
        ids.extend(
            self.store
                .get_friend_ids(viewer_id)?
                .into_iter()
                .filter(|id| *id != viewer_id),
        );
        Ok(ids)
    }
}
