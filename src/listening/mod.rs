mod models;
mod sqlite_store;
mod store;

pub use models::*;
pub use sqlite_store::{SqliteStatsStore, VERSIONED_SCHEMAS};
pub use store::{FullStatsStore, ListeningStatsStore, SocialGraphStore, UserIdentityStore};
