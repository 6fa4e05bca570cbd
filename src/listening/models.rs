use crate::stats::RankedEntity;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Ranked rows
// ============================================================================

/// An artist ranked by qualifying plays. Only primary artists are credited.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TopArtist {
    pub artist_id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub play_count: u64,
    /// Summed listening progress, used as the secondary sort key
    pub total_ms: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TopTrack {
    pub track_id: String,
    pub name: String,
    pub artist_name: Option<String>,
    pub album_image_url: Option<String>,
    pub play_count: u64,
    pub total_ms: u64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TopAlbum {
    pub album_id: String,
    pub name: String,
    pub artist_name: Option<String>,
    pub image_url: Option<String>,
    pub play_count: u64,
    pub total_ms: u64,
}

/// A user's standing among their friends.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub user_id: usize,
    pub handle: String,
    pub display_name: Option<String>,
    /// Play count or seconds listened, depending on [`LeaderboardMetric`]
    pub metric: u64,
}

impl RankedEntity for TopArtist {
    type Id = str;

    fn rank_id(&self) -> &str {
        &self.artist_id
    }

    fn rank_metric(&self) -> f64 {
        self.play_count as f64
    }
}

impl RankedEntity for TopTrack {
    type Id = str;

    fn rank_id(&self) -> &str {
        &self.track_id
    }

    fn rank_metric(&self) -> f64 {
        self.play_count as f64
    }
}

impl RankedEntity for TopAlbum {
    type Id = str;

    fn rank_id(&self) -> &str {
        &self.album_id
    }

    fn rank_metric(&self) -> f64 {
        self.play_count as f64
    }
}

impl RankedEntity for LeaderboardEntry {
    type Id = usize;

    fn rank_id(&self) -> &usize {
        &self.user_id
    }

    fn rank_metric(&self) -> f64 {
        self.metric as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardMetric {
    /// Number of plays that reached the minimum listen duration
    #[default]
    Count,
    /// Seconds listened, all plays included
    Playtime,
}

// ============================================================================
// Activity
// ============================================================================

/// One play in the friends feed.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecentListen {
    pub id: i64,
    pub user_id: usize,
    pub user_handle: String,
    pub user_image_url: Option<String>,
    pub track_id: String,
    pub track_name: String,
    pub artist_name: Option<String>,
    pub album_image_url: Option<String>,
    /// Unix timestamp in milliseconds
    pub played_at: i64,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct ListeningTotals {
    pub total_ms: u64,
    pub distinct_tracks: u64,
    pub distinct_artists: u64,
}

impl ListeningTotals {
    pub fn minutes(&self) -> f64 {
        self.total_ms as f64 / 60_000.0
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DailyPlaytime {
    pub date: NaiveDate,
    pub total_ms: u64,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: usize,
    pub handle: String,
    pub display_name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipStatus {
    Pending = 0,
    Accepted = 1,
}

/// A single play as reported by the tracker.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub user_id: usize,
    pub track_id: String,
    /// Unix timestamp in milliseconds
    pub played_at: i64,
    pub progress_ms: u64,
}
