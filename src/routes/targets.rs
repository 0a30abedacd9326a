// Target registry CRUD. Changes are picked up by the next probe tick.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::{ApiError, AppState};
use crate::models::{Target, TargetPatch};

/// GET /api/targets
pub(super) async fn list_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Target>>, ApiError> {
    Ok(Json(state.target_repo.load()?))
}

/// GET /api/targets/{address}
pub(super) async fn get_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Target>, ApiError> {
    Ok(Json(state.target_repo.get(&address)?))
}

/// POST /api/targets
pub(super) async fn add_handler(
    State(state): State<AppState>,
    Json(target): Json<Target>,
) -> Result<impl IntoResponse, ApiError> {
    let added = state.target_repo.add(target).await?;
    tracing::info!(target_address = %added.address, "target added");
    Ok((StatusCode::CREATED, Json(added)))
}

/// PUT /api/targets/{address}
pub(super) async fn update_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(patch): Json<TargetPatch>,
) -> Result<Json<Target>, ApiError> {
    let updated = state.target_repo.update(&address, patch).await?;
    tracing::info!(target_address = %updated.address, enabled = updated.enabled, "target updated");
    Ok(Json(updated))
}

/// DELETE /api/targets/{address}
pub(super) async fn remove_handler(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Target>, ApiError> {
    let removed = state.target_repo.remove(&address).await?;
    tracing::info!(target_address = %removed.address, "target removed");
    Ok(Json(removed))
}
