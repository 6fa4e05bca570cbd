use anyhow::{Context, Result};
use std::time::Duration;

use chrono::Utc;
use tower_http::services::ServeDir;
use tracing::{error, info};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use super::metrics::{metrics_handler, record_error};
use super::session::Session;
use super::{http_cache, log_requests, state::*, ServerConfig};
use crate::config::StatsSettings;
use crate::reports::{DashboardQuery, FeedQuery, LeaderboardQuery, ReportError, StatsService};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

impl ReportError {
    fn status(&self) -> StatusCode {
        match self {
            ReportError::AccessDenied => StatusCode::FORBIDDEN,
            ReportError::UserNotFound(_) => StatusCode::NOT_FOUND,
            ReportError::InvalidDate(_) | ReportError::InvalidWindow { .. } => {
                StatusCode::BAD_REQUEST
            }
            ReportError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ReportError::AccessDenied => "access_denied",
            ReportError::UserNotFound(_) => "user_not_found",
            ReportError::InvalidDate(_) => "invalid_date",
            ReportError::InvalidWindow { .. } => "invalid_window",
            ReportError::Store(_) => "store",
        }
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ReportError::Store(err) => {
                error!("Stats report failed: {:#}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn respond<T: Serialize>(endpoint: &str, result: Result<T, ReportError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(err) => {
            record_error(err.kind(), endpoint);
            err.into_response()
        }
    }
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

async fn get_dashboard(
    session: Session,
    State(service): State<GuardedStatsService>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    respond(
        "dashboard",
        service.dashboard(session.user_id, &query, Utc::now()),
    )
}

async fn get_leaderboard(
    session: Session,
    State(service): State<GuardedStatsService>,
    Query(query): Query<LeaderboardQuery>,
) -> Response {
    respond(
        "leaderboard",
        service.leaderboard(session.user_id, &query, Utc::now()),
    )
}

async fn get_feed(
    session: Session,
    State(service): State<GuardedStatsService>,
    Query(query): Query<FeedQuery>,
) -> Response {
    respond("feed", service.feed(session.user_id, &query, Utc::now()))
}

pub fn make_app(
    config: ServerConfig,
    store: GuardedStatsStore,
    settings: StatsSettings,
) -> Result<Router> {
    let service = StatsService::new(store.clone(), settings);
    let state = ServerState::new(config.clone(), store, service);

    let stats_routes: Router = Router::new()
        .route("/dashboard", get(get_dashboard))
        .route("/leaderboard", get(get_leaderboard))
        .layer(middleware::from_fn_with_state(
            config.content_cache_age_sec,
            http_cache,
        ))
        .with_state(state.clone());

    let feed_routes: Router = Router::new()
        .route("/v1/feed", get(get_feed))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)).with_state(state.clone()),
    };

    let mut app: Router = home_router
        .nest("/v1/stats", stats_routes)
        .merge(feed_routes);

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(super::slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    store: GuardedStatsStore,
    settings: StatsSettings,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, store, settings)?;

    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server stopped: {}", e);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
