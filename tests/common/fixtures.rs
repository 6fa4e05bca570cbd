//! Test fixture creation for the stats database
//!
//! Plays are placed relative to the moment of seeding so that the server's
//! own clock sees them inside the expected windows:
//! - "previous" plays nine days ago, inside the previous week
//! - "current" plays two days ago, inside the current week
//! - "recent" plays within the last hour, inside the feed window

use super::constants::*;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use soundstats_server::listening::{FriendshipStatus, PlayRecord};
use soundstats_server::SqliteStatsStore;
use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::TempDir;

/// Ids and session tokens of the seeded users, keyed by handle.
pub struct SeededUsers {
    pub ids: HashMap<&'static str, usize>,
    pub tokens: HashMap<&'static str, String>,
    /// The instant every play offset is relative to
    pub seeded_at: DateTime<Utc>,
}

fn create_test_catalog(store: &SqliteStatsStore) -> Result<()> {
    store.upsert_artist(ARTIST_1_ID, ARTIST_1_NAME, Some("/img/artist-1.jpg"))?;
    store.upsert_artist(ARTIST_2_ID, ARTIST_2_NAME, None)?;
    store.upsert_artist(ARTIST_3_ID, ARTIST_3_NAME, None)?;

    store.upsert_album(ALBUM_1_ID, ALBUM_1_TITLE, Some("/img/album-1.jpg"))?;
    store.upsert_album(ALBUM_2_ID, ALBUM_2_TITLE, None)?;

    store.upsert_track(TRACK_1_ID, TRACK_1_TITLE, Some(ALBUM_1_ID), &[(ARTIST_1_ID, true)])?;
    store.upsert_track(TRACK_2_ID, TRACK_2_TITLE, Some(ALBUM_1_ID), &[(ARTIST_1_ID, true)])?;
    store.upsert_track(TRACK_3_ID, TRACK_3_TITLE, Some(ALBUM_2_ID), &[(ARTIST_2_ID, true)])?;
    store.upsert_track(
        TRACK_4_ID,
        TRACK_4_TITLE,
        None,
        &[(ARTIST_3_ID, true), (ARTIST_1_ID, false)],
    )?;
    Ok(())
}

/// Records `count` plays one minute apart, starting at `start`.
fn plays(
    store: &SqliteStatsStore,
    user_id: usize,
    track_id: &str,
    start: DateTime<Utc>,
    count: usize,
    progress_ms: u64,
) -> Result<()> {
    for i in 0..count {
        store.record_play(&PlayRecord {
            user_id,
            track_id: track_id.to_string(),
            played_at: (start + Duration::minutes(i as i64)).timestamp_millis(),
            progress_ms,
        })?;
    }
    Ok(())
}

/// Creates a temporary stats database with catalog, users, friendships and plays.
/// Returns (temp_dir, db_path, users)
pub fn create_test_db() -> Result<(TempDir, PathBuf, SeededUsers)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("stats.db");
    let store = SqliteStatsStore::new(&db_path)?;

    create_test_catalog(&store)?;

    let mut ids = HashMap::new();
    let mut tokens = HashMap::new();
    for handle in [
        TEST_USER,
        FRIEND_USER,
        SECOND_FRIEND_USER,
        STRANGER_USER,
        PENDING_USER,
    ] {
        let id = store.create_user(handle, None)?;
        tokens.insert(handle, store.issue_auth_token(id)?);
        ids.insert(handle, id);
    }
    let alice = ids[TEST_USER];
    let bob = ids[FRIEND_USER];
    let carol = ids[SECOND_FRIEND_USER];
    let mallory = ids[STRANGER_USER];
    let dave = ids[PENDING_USER];

    store.add_friendship(alice, bob, FriendshipStatus::Accepted)?;
    // stored in the other direction on purpose
    store.add_friendship(carol, alice, FriendshipStatus::Accepted)?;
    store.add_friendship(alice, dave, FriendshipStatus::Pending)?;

    let now = Utc::now();
    let previous = now - Duration::days(9);
    let current = now - Duration::days(2);
    let later = Duration::hours(1);

    // alice: artist-2 led last week, artist-1 leads this week
    plays(&store, alice, TRACK_3_ID, previous, 5, FULL_PLAY_MS)?;
    plays(&store, alice, TRACK_1_ID, previous + later, 3, FULL_PLAY_MS)?;
    plays(&store, alice, TRACK_1_ID, current, 6, FULL_PLAY_MS)?;
    plays(&store, alice, TRACK_3_ID, current + later, 2, FULL_PLAY_MS)?;
    plays(&store, alice, TRACK_4_ID, current + later * 2, 1, FULL_PLAY_MS)?;
    plays(&store, alice, TRACK_3_ID, current + later * 3, 1, SHORT_PLAY_MS)?;
    plays(&store, alice, TRACK_2_ID, now - Duration::hours(1), 1, FULL_PLAY_MS)?;

    // bob: climbs from last to first among alice's circle
    plays(&store, bob, TRACK_3_ID, previous, 2, FULL_PLAY_MS)?;
    plays(&store, bob, TRACK_3_ID, current, 10, FULL_PLAY_MS)?;
    plays(&store, bob, TRACK_3_ID, now - Duration::minutes(30), 1, FULL_PLAY_MS)?;

    // carol: led last week, falls to last
    plays(&store, carol, TRACK_2_ID, previous, 9, FULL_PLAY_MS)?;
    plays(&store, carol, TRACK_2_ID, current, 3, FULL_PLAY_MS)?;

    // outside alice's circle
    plays(&store, mallory, TRACK_1_ID, current, 20, FULL_PLAY_MS)?;
    plays(&store, mallory, TRACK_1_ID, now - Duration::minutes(10), 1, FULL_PLAY_MS)?;
    plays(&store, dave, TRACK_1_ID, now - Duration::minutes(20), 1, FULL_PLAY_MS)?;

    Ok((
        dir,
        db_path,
        SeededUsers {
            ids,
            tokens,
            seeded_at: now,
        },
    ))
}
