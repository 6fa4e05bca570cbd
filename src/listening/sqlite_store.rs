use super::models::*;
use super::store::{ListeningStatsStore, SocialGraphStore, UserIdentityStore};
use crate::server::metrics::record_db_query;
use crate::sqlite_column;
use crate::sqlite_persistence::{
    migrate_if_needed, Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};
use crate::stats::PeriodWindow;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rand::{rng, Rng};
use rand_distr::Alphanumeric;
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info};

const AUTH_TOKEN_LENGTH: usize = 48;

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("display_name", &SqlType::Text),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};
const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    indices: &[("idx_auth_token_value", "value")],
    unique_constraints: &[],
};
const FRIENDSHIP_TABLE_V_0: Table = Table {
    name: "friendship",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "friend_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        // 0 = pending, 1 = accepted
        sqlite_column!("status", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[
        ("idx_friendship_user", "user_id"),
        ("idx_friendship_friend", "friend_id"),
    ],
    unique_constraints: &[&["user_id", "friend_id"]],
};
const ARTIST_TABLE_V_0: Table = Table {
    name: "artist",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
};
const ALBUM_TABLE_V_0: Table = Table {
    name: "album",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("image_url", &SqlType::Text),
    ],
    indices: &[],
    unique_constraints: &[],
};
const TRACK_TABLE_V_0: Table = Table {
    name: "track",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "album_id",
            &SqlType::Text,
            foreign_key = Some(&ForeignKey {
                foreign_table: "album",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::SetNull,
            })
        ),
    ],
    indices: &[("idx_track_album", "album_id")],
    unique_constraints: &[],
};
const ARTIST_TRACK_TABLE_V_0: Table = Table {
    name: "artist_track",
    columns: &[
        sqlite_column!(
            "artist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "artist",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "track",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("is_primary", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_artist_track_track", "track_id")],
    unique_constraints: &[&["artist_id", "track_id"]],
};
const LISTENING_HISTORY_TABLE_V_0: Table = Table {
    name: "listening_history",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "track_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "track",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        // unix millis
        sqlite_column!("played_at", &SqlType::Integer, non_null = true),
        sqlite_column!("progress_ms", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_listening_history_user_played", "user_id, played_at"),
        ("idx_listening_history_played", "played_at"),
    ],
    unique_constraints: &[],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        AUTH_TOKEN_TABLE_V_0,
        FRIENDSHIP_TABLE_V_0,
        ARTIST_TABLE_V_0,
        ALBUM_TABLE_V_0,
        TRACK_TABLE_V_0,
        ARTIST_TRACK_TABLE_V_0,
        LISTENING_HISTORY_TABLE_V_0,
    ],
    migration: None,
}];

/// Primary artist of track `t`, first by name when a track has several.
const PRIMARY_ARTIST_OF_TRACK: &str = "(SELECT a.name FROM artist_track atr \
    JOIN artist a ON a.id = atr.artist_id \
    WHERE atr.track_id = t.id AND atr.is_primary = 1 \
    ORDER BY a.name LIMIT 1)";

/// Primary artist of album `al`, taken from its tracks.
const PRIMARY_ARTIST_OF_ALBUM: &str = "(SELECT a.name FROM track t2 \
    JOIN artist_track atr ON atr.track_id = t2.id AND atr.is_primary = 1 \
    JOIN artist a ON a.id = atr.artist_id \
    WHERE t2.album_id = al.id \
    ORDER BY a.name LIMIT 1)";

fn window_bounds(window: Option<&PeriodWindow>) -> (i64, i64) {
    match window {
        Some(window) => window.as_millis(),
        None => (i64::MIN, i64::MAX),
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn user_id_values(user_ids: &[usize]) -> Vec<Value> {
    user_ids
        .iter()
        .map(|id| Value::Integer(*id as i64))
        .collect()
}

pub struct SqliteStatsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStatsStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = if db_path.exists() {
            let conn = Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_context(|| format!("Failed to open stats database {:?}", db_path))?;
            conn.execute("PRAGMA foreign_keys = ON;", [])?;
            let version = migrate_if_needed(&conn, VERSIONED_SCHEMAS)?;
            debug!("Opened stats database {:?} at version {}", db_path, version);
            conn
        } else {
            info!("Creating stats database at {:?}", db_path);
            let conn = Connection::open(db_path)?;
            conn.execute("PRAGMA foreign_keys = ON;", [])?;
            VERSIONED_SCHEMAS
                .last()
                .context("No schema defined")?
                .create(&conn)?;
            conn
        };

        Ok(SqliteStatsStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Stats database mutex poisoned"))
    }

    fn timed<R>(&self, operation: &str, f: impl FnOnce(&Connection) -> Result<R>) -> Result<R> {
        let conn = self.lock()?;
        let start = Instant::now();
        let result = f(&conn);
        record_db_query(operation, start.elapsed());
        result
    }

    // ========================================================================
    // Write side, used by the tracker and by seeding tools
    // ========================================================================

    pub fn create_user(&self, handle: &str, display_name: Option<&str>) -> Result<usize> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO user (handle, display_name) VALUES (?1, ?2)",
            params![handle, display_name],
        )
        .with_context(|| format!("Failed to create user {}", handle))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    pub fn get_user_id_by_handle(&self, handle: &str) -> Result<Option<usize>> {
        let conn = self.lock()?;
        let id = conn
            .query_row(
                "SELECT id FROM user WHERE handle = ?1",
                params![handle],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(|id| id as usize))
    }

    /// Creates a new session token for `user_id`.
    pub fn issue_auth_token(&self, user_id: usize) -> Result<String> {
        let token: String = rng()
            .sample_iter(&Alphanumeric)
            .take(AUTH_TOKEN_LENGTH)
            .map(char::from)
            .collect();
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO auth_token (user_id, value) VALUES (?1, ?2)",
            params![user_id as i64, token],
        )
        .with_context(|| format!("Failed to issue token for user {}", user_id))?;
        Ok(token)
    }

    pub fn upsert_artist(&self, id: &str, name: &str, image_url: Option<&str>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO artist (id, name, image_url) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, image_url = excluded.image_url",
            params![id, name, image_url],
        )?;
        Ok(())
    }

    pub fn upsert_album(&self, id: &str, name: &str, image_url: Option<&str>) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO album (id, name, image_url) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, image_url = excluded.image_url",
            params![id, name, image_url],
        )?;
        Ok(())
    }

    /// Inserts or updates a track together with its credited artists.
    pub fn upsert_track(
        &self,
        id: &str,
        name: &str,
        album_id: Option<&str>,
        artists: &[(&str, bool)],
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO track (id, name, album_id) VALUES (?1, ?2, ?3) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, album_id = excluded.album_id",
            params![id, name, album_id],
        )?;
        tx.execute("DELETE FROM artist_track WHERE track_id = ?1", params![id])?;
        for (artist_id, is_primary) in artists {
            tx.execute(
                "INSERT INTO artist_track (artist_id, track_id, is_primary) VALUES (?1, ?2, ?3)",
                params![artist_id, id, *is_primary as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn record_play(&self, play: &PlayRecord) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO listening_history (user_id, track_id, played_at, progress_ms) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                play.user_id as i64,
                play.track_id,
                play.played_at,
                play.progress_ms as i64
            ],
        )
        .with_context(|| {
            format!(
                "Failed to record play of {} for user {}",
                play.track_id, play.user_id
            )
        })?;
        Ok(conn.last_insert_rowid())
    }

    /// Seeds a friendship row. Requests and their acceptance live elsewhere.
    pub fn add_friendship(
        &self,
        user_id: usize,
        friend_id: usize,
        status: FriendshipStatus,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO friendship (user_id, friend_id, status) VALUES (?1, ?2, ?3)",
            params![user_id as i64, friend_id as i64, status as i64],
        )?;
        Ok(())
    }
}

impl ListeningStatsStore for SqliteStatsStore {
    fn get_top_artists(
        &self,
        user_id: usize,
        window: &PeriodWindow,
        min_listen_ms: u64,
        limit: usize,
    ) -> Result<Vec<TopArtist>> {
        let (from, to) = window.as_millis();
        self.timed("top_artists", |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.name, a.image_url, COUNT(*) AS plays, SUM(h.progress_ms) AS total_ms \
                 FROM listening_history h \
                 JOIN artist_track atr ON atr.track_id = h.track_id AND atr.is_primary = 1 \
                 JOIN artist a ON a.id = atr.artist_id \
                 WHERE h.user_id = ?1 AND h.played_at >= ?2 AND h.played_at < ?3 \
                   AND h.progress_ms >= ?4 \
                 GROUP BY a.id \
                 ORDER BY plays DESC, total_ms DESC, a.name ASC \
                 LIMIT ?5",
            )?;
            let rows = stmt
                .query_map(
                    params![user_id as i64, from, to, min_listen_ms as i64, limit as i64],
                    |row| {
                        Ok(TopArtist {
                            artist_id: row.get(0)?,
                            name: row.get(1)?,
                            image_url: row.get(2)?,
                            play_count: row.get::<_, i64>(3)? as u64,
                            total_ms: row.get::<_, i64>(4)? as u64,
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn get_top_tracks(
        &self,
        user_id: usize,
        window: &PeriodWindow,
        min_listen_ms: u64,
        limit: usize,
    ) -> Result<Vec<TopTrack>> {
        let (from, to) = window.as_millis();
        self.timed("top_tracks", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT t.id, t.name, {} AS artist_name, al.image_url, \
                   COUNT(*) AS plays, SUM(h.progress_ms) AS total_ms \
                 FROM listening_history h \
                 JOIN track t ON t.id = h.track_id \
                 LEFT JOIN album al ON al.id = t.album_id \
                 WHERE h.user_id = ?1 AND h.played_at >= ?2 AND h.played_at < ?3 \
                   AND h.progress_ms >= ?4 \
                 GROUP BY t.id \
                 ORDER BY plays DESC, total_ms DESC, t.name ASC \
                 LIMIT ?5",
                PRIMARY_ARTIST_OF_TRACK
            ))?;
            let rows = stmt
                .query_map(
                    params![user_id as i64, from, to, min_listen_ms as i64, limit as i64],
                    |row| {
                        Ok(TopTrack {
                            track_id: row.get(0)?,
                            name: row.get(1)?,
                            artist_name: row.get(2)?,
                            album_image_url: row.get(3)?,
                            play_count: row.get::<_, i64>(4)? as u64,
                            total_ms: row.get::<_, i64>(5)? as u64,
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn get_top_albums(
        &self,
        user_id: usize,
        window: &PeriodWindow,
        min_listen_ms: u64,
        limit: usize,
    ) -> Result<Vec<TopAlbum>> {
        let (from, to) = window.as_millis();
        self.timed("top_albums", |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT al.id, al.name, {} AS artist_name, al.image_url, \
                   COUNT(*) AS plays, SUM(h.progress_ms) AS total_ms \
                 FROM listening_history h \
                 JOIN track t ON t.id = h.track_id \
                 JOIN album al ON al.id = t.album_id \
                 WHERE h.user_id = ?1 AND h.played_at >= ?2 AND h.played_at < ?3 \
                   AND h.progress_ms >= ?4 \
                 GROUP BY al.id \
                 ORDER BY plays DESC, total_ms DESC, al.name ASC \
                 LIMIT ?5",
                PRIMARY_ARTIST_OF_ALBUM
            ))?;
            let rows = stmt
                .query_map(
                    params![user_id as i64, from, to, min_listen_ms as i64, limit as i64],
                    |row| {
                        Ok(TopAlbum {
                            album_id: row.get(0)?,
                            name: row.get(1)?,
                            artist_name: row.get(2)?,
                            image_url: row.get(3)?,
                            play_count: row.get::<_, i64>(4)? as u64,
                            total_ms: row.get::<_, i64>(5)? as u64,
                        })
                    },
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn count_leaderboard_users(
        &self,
        user_ids: &[usize],
        window: Option<&PeriodWindow>,
        metric: LeaderboardMetric,
        min_listen_ms: u64,
    ) -> Result<usize> {
        let (from, to) = window_bounds(window);
        let min_progress = match metric {
            LeaderboardMetric::Count => min_listen_ms as i64,
            LeaderboardMetric::Playtime => 0,
        };
        self.timed("count_leaderboard_users", |conn| {
            let sql = format!(
                "SELECT COUNT(DISTINCT h.user_id) FROM listening_history h \
                 WHERE h.user_id IN ({}) AND h.played_at >= ? AND h.played_at < ? \
                   AND h.progress_ms >= ?",
                placeholders(user_ids.len())
            );
            let mut values = user_id_values(user_ids);
            values.extend([
                Value::Integer(from),
                Value::Integer(to),
                Value::Integer(min_progress),
            ]);
            let count: i64 = conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    fn get_leaderboard(
        &self,
        user_ids: &[usize],
        window: Option<&PeriodWindow>,
        metric: LeaderboardMetric,
        min_listen_ms: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LeaderboardEntry>> {
        let (from, to) = window_bounds(window);
        let (metric_sql, min_progress) = match metric {
            LeaderboardMetric::Count => ("COUNT(*)", min_listen_ms as i64),
            LeaderboardMetric::Playtime => ("SUM(h.progress_ms) / 1000", 0),
        };
        self.timed("leaderboard", |conn| {
            let sql = format!(
                "SELECT u.id, u.handle, u.display_name, {} AS metric, SUM(h.progress_ms) AS total_ms \
                 FROM listening_history h \
                 JOIN user u ON u.id = h.user_id \
                 WHERE h.user_id IN ({}) AND h.played_at >= ? AND h.played_at < ? \
                   AND h.progress_ms >= ? \
                 GROUP BY u.id \
                 ORDER BY metric DESC, total_ms DESC, u.handle ASC \
                 LIMIT ? OFFSET ?",
                metric_sql,
                placeholders(user_ids.len())
            );
            let mut values = user_id_values(user_ids);
            values.extend([
                Value::Integer(from),
                Value::Integer(to),
                Value::Integer(min_progress),
                Value::Integer(limit as i64),
                Value::Integer(offset as i64),
            ]);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values), |row| {
                    Ok(LeaderboardEntry {
                        user_id: row.get::<_, i64>(0)? as usize,
                        handle: row.get(1)?,
                        display_name: row.get(2)?,
                        metric: row.get::<_, i64>(3)? as u64,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn get_listening_totals(
        &self,
        user_id: usize,
        window: &PeriodWindow,
        min_listen_ms: u64,
    ) -> Result<ListeningTotals> {
        let (from, to) = window.as_millis();
        self.timed("listening_totals", |conn| {
            let (total_ms, distinct_tracks): (i64, i64) = conn.query_row(
                "SELECT COALESCE(SUM(progress_ms), 0), \
                   COUNT(DISTINCT CASE WHEN progress_ms >= ?4 THEN track_id END) \
                 FROM listening_history \
                 WHERE user_id = ?1 AND played_at >= ?2 AND played_at < ?3",
                params![user_id as i64, from, to, min_listen_ms as i64],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let distinct_artists: i64 = conn.query_row(
                "SELECT COUNT(DISTINCT atr.artist_id) FROM listening_history h \
                 JOIN artist_track atr ON atr.track_id = h.track_id AND atr.is_primary = 1 \
                 WHERE h.user_id = ?1 AND h.played_at >= ?2 AND h.played_at < ?3 \
                   AND h.progress_ms >= ?4",
                params![user_id as i64, from, to, min_listen_ms as i64],
                |row| row.get(0),
            )?;
            Ok(ListeningTotals {
                total_ms: total_ms as u64,
                distinct_tracks: distinct_tracks as u64,
                distinct_artists: distinct_artists as u64,
            })
        })
    }

    fn get_daily_playtime(
        &self,
        user_id: usize,
        window: &PeriodWindow,
    ) -> Result<Vec<DailyPlaytime>> {
        let (from, to) = window.as_millis();
        self.timed("daily_playtime", |conn| {
            let mut stmt = conn.prepare(
                "SELECT date(played_at / 1000, 'unixepoch') AS day, SUM(progress_ms) \
                 FROM listening_history \
                 WHERE user_id = ?1 AND played_at >= ?2 AND played_at < ?3 \
                 GROUP BY day ORDER BY day ASC",
            )?;
            let raw = stmt
                .query_map(params![user_id as i64, from, to], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            raw.into_iter()
                .map(|(day, total_ms)| -> Result<DailyPlaytime> {
                    let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                        .with_context(|| format!("Invalid day {} in listening history", day))?;
                    Ok(DailyPlaytime {
                        date,
                        total_ms: total_ms as u64,
                    })
                })
                .collect()
        })
    }

    fn get_recent_listens(
        &self,
        user_ids: &[usize],
        since: DateTime<Utc>,
        min_listen_ms: u64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RecentListen>> {
        self.timed("recent_listens", |conn| {
            let sql = format!(
                "SELECT h.id, h.user_id, u.handle, u.image_url, t.id, t.name, {} AS artist_name, \
                   al.image_url, h.played_at \
                 FROM listening_history h \
                 JOIN user u ON u.id = h.user_id \
                 JOIN track t ON t.id = h.track_id \
                 LEFT JOIN album al ON al.id = t.album_id \
                 WHERE h.user_id IN ({}) AND h.played_at >= ? AND h.progress_ms >= ? \
                 ORDER BY h.played_at DESC, h.id DESC \
                 LIMIT ? OFFSET ?",
                PRIMARY_ARTIST_OF_TRACK,
                placeholders(user_ids.len())
            );
            let mut values = user_id_values(user_ids);
            values.extend([
                Value::Integer(since.timestamp_millis()),
                Value::Integer(min_listen_ms as i64),
                Value::Integer(limit as i64),
                Value::Integer(offset as i64),
            ]);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values), |row| {
                    Ok(RecentListen {
                        id: row.get(0)?,
                        user_id: row.get::<_, i64>(1)? as usize,
                        user_handle: row.get(2)?,
                        user_image_url: row.get(3)?,
                        track_id: row.get(4)?,
                        track_name: row.get(5)?,
                        artist_name: row.get(6)?,
                        album_image_url: row.get(7)?,
                        played_at: row.get(8)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn get_first_listen_at(&self, user_id: usize) -> Result<Option<DateTime<Utc>>> {
        self.timed("first_listen", |conn| {
            let first: Option<i64> = conn.query_row(
                "SELECT MIN(played_at) FROM listening_history WHERE user_id = ?1",
                params![user_id as i64],
                |row| row.get(0),
            )?;
            Ok(first.and_then(DateTime::from_timestamp_millis))
        })
    }
}

impl SocialGraphStore for SqliteStatsStore {
    fn get_friend_ids(&self, user_id: usize) -> Result<Vec<usize>> {
        self.timed("friend_ids", |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT CASE WHEN user_id = ?1 THEN friend_id ELSE user_id END \
                 FROM friendship \
                 WHERE (user_id = ?1 OR friend_id = ?1) AND status = ?2",
            )?;
            let ids = stmt
                .query_map(
                    params![user_id as i64, FriendshipStatus::Accepted as i64],
                    |row| row.get::<_, i64>(0),
                )?
                .map(|id| id.map(|id| id as usize))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    fn are_friends(&self, user_id: usize, other_id: usize) -> Result<bool> {
        self.timed("are_friends", |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM friendship WHERE status = ?3 AND \
                 ((user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1))",
                params![
                    user_id as i64,
                    other_id as i64,
                    FriendshipStatus::Accepted as i64
                ],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }
}

impl UserIdentityStore for SqliteStatsStore {
    fn get_user(&self, user_id: usize) -> Result<Option<UserProfile>> {
        self.timed("get_user", |conn| {
            let user = conn
                .query_row(
                    "SELECT id, handle, display_name, image_url FROM user WHERE id = ?1",
                    params![user_id as i64],
                    |row| {
                        Ok(UserProfile {
                            id: row.get::<_, i64>(0)? as usize,
                            handle: row.get(1)?,
                            display_name: row.get(2)?,
                            image_url: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
    }

    fn get_user_id_for_token(&self, token: &str) -> Result<Option<usize>> {
        self.timed("user_for_token", |conn| {
            let user_id = conn
                .query_row(
                    "SELECT user_id FROM auth_token WHERE value = ?1",
                    params![token],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if user_id.is_some() {
                conn.execute(
                    &format!(
                        "UPDATE auth_token SET last_used = {} WHERE value = ?1",
                        DEFAULT_TIMESTAMP
                    ),
                    params![token],
                )?;
            }
            Ok(user_id.map(|id| id as usize))
        })
    }
}
