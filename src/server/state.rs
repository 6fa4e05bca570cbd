use axum::extract::FromRef;

use crate::listening::FullStatsStore;
use crate::reports::StatsService;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedStatsStore = Arc<dyn FullStatsStore>;
pub type GuardedStatsService = Arc<StatsService>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub store: GuardedStatsStore,
    pub stats_service: GuardedStatsService,
    pub hash: String,
}

impl ServerState {
    pub fn new(config: ServerConfig, store: GuardedStatsStore, stats_service: StatsService) -> Self {
        ServerState {
            config,
            start_time: Instant::now(),
            store,
            stats_service: Arc::new(stats_service),
            hash: env!("SOUNDSTATS_BUILD_HASH").to_owned(),
        }
    }
}

impl FromRef<ServerState> for GuardedStatsStore {
    fn from_ref(input: &ServerState) -> Self {
        input.store.clone()
    }
}

impl FromRef<ServerState> for GuardedStatsService {
    fn from_ref(input: &ServerState) -> Self {
        input.stats_service.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
