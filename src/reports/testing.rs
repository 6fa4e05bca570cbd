use crate::config::StatsSettings;
use crate::listening::{FriendshipStatus, PlayRecord, SqliteStatsStore};
use crate::reports::StatsService;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

pub struct Fixture {
    pub store: Arc<SqliteStatsStore>,
    pub service: StatsService,
    _dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_settings(StatsSettings::default())
    }

    pub fn with_settings(settings: StatsSettings) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStatsStore::new(dir.path().join("stats.db")).unwrap());
        store.upsert_album("al-1", "Album One", Some("one.jpg")).unwrap();
        for (artist, track) in [("ar-a", "t-a"), ("ar-b", "t-b"), ("ar-c", "t-c"), ("ar-d", "t-d")] {
            store
                .upsert_artist(artist, &artist.to_uppercase(), None)
                .unwrap();
            store
                .upsert_track(track, &track.to_uppercase(), Some("al-1"), &[(artist, true)])
                .unwrap();
        }
        let service = StatsService::new(store.clone(), settings);
        Self {
            store,
            service,
            _dir: dir,
        }
    }

    pub fn user(&self, handle: &str) -> usize {
        self.store.create_user(handle, None).unwrap()
    }

    pub fn befriend(&self, a: usize, b: usize) {
        self.store
            .add_friendship(a, b, FriendshipStatus::Accepted)
            .unwrap();
    }

    /// `count` full plays of `track` starting at `when`, one minute apart.
    pub fn plays(&self, user_id: usize, track: &str, when: DateTime<Utc>, count: usize) {
        for n in 0..count {
            self.store
                .record_play(&PlayRecord {
                    user_id,
                    track_id: track.to_string(),
                    played_at: when.timestamp_millis() + n as i64 * 60_000,
                    progress_ms: 180_000,
                })
                .unwrap();
        }
    }
}

pub fn at(month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, month, day, hour, 0, 0).unwrap()
}
