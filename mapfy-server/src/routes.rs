//! Map CRUD route handlers.
//!
//! All routes require a bearer token; the [`AuthUser`] extractor rejects
//! requests without one. Maps are visible only to their owner — a foreign
//! map ID behaves exactly like a missing one.

use axum::extract::{Path, State};
use axum::Json;
use mapfy_core::{MapDocument, MapPayload, MapSummary};
use serde_json::{json, Value};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::validation::{validate_description, validate_feature_count, validate_map_name};
use crate::AppState;

fn validate_payload(payload: &MapPayload, require_name: bool) -> Result<(), ApiError> {
    match &payload.name {
        Some(name) => validate_map_name(name)?,
        None if require_name => validate_map_name("")?,
        None => {}
    }
    if let Some(description) = &payload.description {
        validate_description(description)?;
    }
    if let Some(geojson) = &payload.geojson {
        validate_feature_count(geojson.len())?;
    }
    Ok(())
}

/// `GET /api/maps` — the caller's maps, most recently updated first.
#[tracing::instrument(name = "list_maps", skip_all, fields(user = %user.0.id))]
pub async fn list_maps(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<MapSummary>>, ApiError> {
    Ok(Json(state.maps.list(&user.0.id)))
}

/// `GET /api/maps/{id}` — fetch one map.
#[tracing::instrument(name = "get_map", skip_all, fields(user = %user.0.id, id = %id))]
pub async fn get_map(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MapDocument>, ApiError> {
    state
        .maps
        .get(&user.0.id, &id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Map not found".into()))
}

/// `POST /api/maps` — create a map.
#[tracing::instrument(name = "create_map", skip_all, fields(user = %user.0.id))]
pub async fn create_map(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<MapPayload>,
) -> Result<Json<MapDocument>, ApiError> {
    validate_payload(&payload, true)?;
    let document = state.maps.create(&user.0.id, payload);
    tracing::info!(id = %document.id, "map created");
    Ok(Json(document))
}

/// `PUT /api/maps/{id}` — partial update of a map.
#[tracing::instrument(name = "update_map", skip_all, fields(user = %user.0.id, id = %id))]
pub async fn update_map(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<MapPayload>,
) -> Result<Json<MapDocument>, ApiError> {
    validate_payload(&payload, false)?;
    let document = state.maps.update(&user.0.id, &id, payload)?;
    Ok(Json(document))
}

/// `DELETE /api/maps/{id}` — delete a map.
#[tracing::instrument(name = "delete_map", skip_all, fields(user = %user.0.id, id = %id))]
pub async fn delete_map(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.maps.delete(&user.0.id, &id)?;
    tracing::info!("map deleted");
    Ok(Json(json!({ "message": "Map deleted" })))
}
