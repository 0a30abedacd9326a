// HTTP routes: stats, history, status, live health check, target registry, on-demand purge

mod http;
mod targets;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregator::Aggregator;
use crate::config::AppConfig;
use crate::health::HealthCheck;
use crate::retention::RetentionManager;
use crate::sample_repo::SampleRepo;
use crate::target_repo::{RegistryError, TargetRepo};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) aggregator: Arc<Aggregator>,
    pub(crate) sample_repo: Arc<SampleRepo>,
    pub(crate) target_repo: Arc<TargetRepo>,
    pub(crate) retention: Arc<RetentionManager>,
    pub(crate) health: Arc<dyn HealthCheck>,
    pub(crate) config: AppConfig,
}

pub fn app(
    sample_repo: Arc<SampleRepo>,
    target_repo: Arc<TargetRepo>,
    retention: Arc<RetentionManager>,
    health: Arc<dyn HealthCheck>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        aggregator: Arc::new(Aggregator::new(sample_repo.clone())),
        sample_repo,
        target_repo,
        retention,
        health,
        config,
    };
    Router::new()
        .route("/", get(|| async { "healthmon: host and network health monitor" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/stats/summary", get(http::summary_handler))
        .route("/api/stats/resources", get(http::resource_stats_handler))
        .route("/api/stats/probes", get(http::probe_stats_handler))
        .route("/api/status/latest", get(http::latest_handler))
        .route("/api/history/resources", get(http::resource_history_handler))
        .route("/api/history/probes", get(http::probe_history_handler))
        .route("/api/health/check", get(http::health_check_handler))
        .route("/api/retention/purge", post(http::purge_handler))
        .route(
            "/api/targets",
            get(targets::list_handler).post(targets::add_handler),
        )
        .route(
            "/api/targets/{address}",
            get(targets::get_handler)
                .put(targets::update_handler)
                .delete(targets::remove_handler),
        )
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

/// Error body for non-stats endpoints: `{"error": "..."}` with a matching status.
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn internal(e: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        let status = match &e {
            RegistryError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            RegistryError::Duplicate(_) => StatusCode::CONFLICT,
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
            RegistryError::Io(_) | RegistryError::Parse(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::warn!(status = %self.status, error = %self.message, "request failed");
        }
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}
