//! Period-over-period comparison of ranked lists.
//!
//! The current list is taken in the order the caller produced it; each entry
//! is looked up in the previous list by id and annotated with how its rank
//! and metric moved. Entries only present in the previous list are dropped.
//!
//! The previous list is usually fetched larger than the current one (see
//! `previous_fetch_factor` in the stats settings) so that entities which
//! were ranked just below the displayed cut-off last period can still be
//! found. Anything missing from the previous list, including entities that
//! existed below its own cut-off, is reported as new. This is an accepted
//! approximation.

use serde::Serialize;
use std::ops::Deref;

/// A current-period entity plus its movement relative to the previous period.
///
/// `rank_change` and `previous_rank` are either both present or both absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compared<T> {
    #[serde(flatten)]
    pub entity: T,
    /// Previous rank minus current rank, positive when the entity moved up.
    pub rank_change: Option<i64>,
    /// Signed percentage, not rounded.
    pub percent_change: Option<f64>,
    /// 1-based position in the previous list.
    pub previous_rank: Option<usize>,
}

impl<T> Compared<T> {
    fn unmatched(entity: T) -> Self {
        Self {
            entity,
            rank_change: None,
            percent_change: None,
            previous_rank: None,
        }
    }

    pub fn is_new(&self) -> bool {
        self.previous_rank.is_none()
    }

    pub fn trend(&self) -> Option<Trend> {
        self.percent_change.map(Trend::of)
    }
}

impl<T> Deref for Compared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.entity
    }
}

/// Direction of a metric change, as shown by the change badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn of(percent_change: f64) -> Self {
        if percent_change > 0.0 {
            Trend::Up
        } else if percent_change < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

/// `(current - previous) / previous * 100`, or `0.0` when `previous` is zero.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Annotates every entry of `current` with its movement relative to `previous`.
///
/// Lookups are a linear scan, first match wins when `previous` repeats an id.
pub fn compare<T, K, I, M>(
    current: Vec<T>,
    previous: &[T],
    id_of: I,
    metric_of: M,
) -> Vec<Compared<T>>
where
    K: PartialEq + ?Sized,
    I: Fn(&T) -> &K,
    M: Fn(&T) -> f64,
{
    current
        .into_iter()
        .enumerate()
        .map(|(current_index, entity)| {
            let id = id_of(&entity);
            let found = previous
                .iter()
                .position(|candidate| id_of(candidate) == id);

            match found {
                None => Compared::unmatched(entity),
                Some(previous_index) => {
                    let change =
                        percent_change(metric_of(&entity), metric_of(&previous[previous_index]));
                    Compared {
                        entity,
                        rank_change: Some(previous_index as i64 - current_index as i64),
                        percent_change: Some(change),
                        previous_rank: Some(previous_index + 1),
                    }
                }
            }
        })
        .collect()
}

/// A row that can be ranked: a stable id and the metric it is ordered by.
pub trait RankedEntity {
    type Id: PartialEq + ?Sized;

    fn rank_id(&self) -> &Self::Id;
    fn rank_metric(&self) -> f64;
}

pub fn compare_ranked<T: RankedEntity>(current: Vec<T>, previous: &[T]) -> Vec<Compared<T>> {
    compare(current, previous, T::rank_id, T::rank_metric)
}
