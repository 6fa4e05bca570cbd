//! Soundstats Server Library
//!
//! Listening statistics over a user's play history: period-over-period
//! rankings, friends leaderboards and the friends feed.

pub mod config;
pub mod listening;
pub mod reports;
pub mod server;
pub mod sqlite_persistence;
pub mod stats;

pub use listening::{FullStatsStore, SqliteStatsStore};
pub use reports::StatsService;
pub use server::{run_server, RequestsLoggingLevel};
