// GET handlers: version, stats, latest status, history, live health check; POST purge

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::aggregator::window_start;
use crate::models::{HealthReport, LatestStatus, now_ms};
use crate::version::{NAME, VERSION};

/// Longest window a request may ask for (one year).
const MAX_WINDOW_HOURS: u32 = 24 * 365;

/// `?hours=&target=`. `hours` is read leniently so stats endpoints never reject a request.
#[derive(Debug, Default, Deserialize)]
pub(super) struct WindowQuery {
    hours: Option<String>,
    target: Option<String>,
}

impl WindowQuery {
    /// Requested window, or `default` when absent, zero or not a number.
    fn hours(&self, default: u32) -> u32 {
        self.hours
            .as_deref()
            .and_then(|h| h.trim().parse::<u32>().ok())
            .filter(|h| *h > 0)
            .map(|h| h.min(MAX_WINDOW_HOURS))
            .unwrap_or(default)
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PurgeQuery {
    days: Option<u32>,
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/stats/summary
pub(super) async fn summary_handler(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> impl IntoResponse {
    let hours = q.hours(state.config.stats.window_hours);
    Json(state.aggregator.compute_summary(hours).await)
}

/// GET /api/stats/resources
pub(super) async fn resource_stats_handler(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> impl IntoResponse {
    let hours = q.hours(state.config.stats.window_hours);
    Json(state.aggregator.compute_resource_stats(hours).await)
}

/// GET /api/stats/probes: all targets, or one with `?target=`.
pub(super) async fn probe_stats_handler(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> impl IntoResponse {
    let hours = q.hours(state.config.stats.window_hours);
    Json(state.aggregator.compute_probe_stats(hours, q.target()).await)
}

/// GET /api/status/latest
pub(super) async fn latest_handler(
    State(state): State<AppState>,
) -> Result<Json<LatestStatus>, ApiError> {
    let resources = state
        .sample_repo
        .latest_resource()
        .await
        .map_err(ApiError::internal)?;
    let probes = state
        .sample_repo
        .latest_probes()
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(LatestStatus { resources, probes }))
}

/// GET /api/history/resources: raw samples in the window, oldest first.
pub(super) async fn resource_history_handler(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let since = window_start(now_ms(), q.hours(state.config.stats.window_hours));
    let samples = state
        .sample_repo
        .query_resources_since(since)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(samples))
}

/// GET /api/history/probes
pub(super) async fn probe_history_handler(
    State(state): State<AppState>,
    Query(q): Query<WindowQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let since = window_start(now_ms(), q.hours(state.config.stats.window_hours));
    let samples = state
        .sample_repo
        .query_probes_since(since, q.target())
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(samples))
}

/// GET /api/health/check: probes enabled targets now and reports without storing anything.
pub(super) async fn health_check_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health.run().await)
}

/// POST /api/retention/purge?days=: defaults to the configured horizon.
pub(super) async fn purge_handler(
    State(state): State<AppState>,
    Query(q): Query<PurgeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let days = q.days.unwrap_or_else(|| state.retention.max_age_days());
    if days == 0 {
        return Err(ApiError::bad_request("days must be > 0"));
    }
    let counts = state
        .retention
        .purge(days)
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(counts))
}
