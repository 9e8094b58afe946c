mod routes;

use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use chemviz_core::config::AppConfig;
use chemviz_core::db;
use chemviz_core::history::{HistoryStore, InMemoryHistoryStore, PostgresHistoryStore};
use chemviz_core::ingestion::IngestPipeline;
use chrono_tz::Tz;
use tracing::{info, warn};

pub use routes::ApiError;

pub struct AppState {
    pub pipeline: IngestPipeline,
    pub timezone: Tz,
}

impl AppState {
    pub fn new(history: Arc<dyn HistoryStore>, timezone: Tz) -> Self {
        Self {
            pipeline: IngestPipeline::new(history),
            timezone,
        }
    }
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/upload/", post(routes::upload))
        .route("/api/upload", post(routes::upload))
        .route("/api/history/", get(routes::history))
        .route("/api/history", get(routes::history))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

/// Postgres when a database URL is configured, otherwise a process-local store.
pub async fn build_history_store(config: &AppConfig) -> Result<Arc<dyn HistoryStore>> {
    match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = db::connect(database_url, &config.pool).await?;
            db::run_migrations(&pool).await?;
            info!("history store: postgres");
            Ok(Arc::new(PostgresHistoryStore::new(pool)))
        }
        None => {
            warn!("no database URL configured; upload history will not survive a restart");
            Ok(Arc::new(InMemoryHistoryStore::new()))
        }
    }
}
