//! Prompt action routes — CRUD plus JSON import/export.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::routes::{ApiError, ApiResult};
use crate::state::AppState;
use tutor_store::actions::ActionInput;
use tutor_store::Action;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/actions", get(list_actions).post(create_action))
        .route(
            "/actions/{id}",
            get(get_action).put(update_action).delete(delete_action),
        )
        .route("/actions/import", post(import_actions))
        .route("/actions/export", get(export_actions))
}

async fn list_actions(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Action>>> {
    Ok(Json(state.actions.list()?))
}

async fn create_action(
    State(state): State<Arc<AppState>>,
    Json(input): Json<ActionInput>,
) -> ApiResult<Json<Action>> {
    let id = state.actions.create(&input)?;
    Ok(Json(state.actions.get(id)?))
}

async fn get_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Action>> {
    Ok(Json(state.actions.get(id)?))
}

async fn update_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(input): Json<ActionInput>,
) -> ApiResult<Json<Action>> {
    state.actions.update(id, &input)?;
    Ok(Json(state.actions.get(id)?))
}

async fn delete_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let deleted = state.actions.delete(id)?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// POST /api/actions/import — accepts a bare action array or an
/// `{"actions": [...]}` wrapper; a malformed payload aborts the import.
async fn import_actions(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<Json<serde_json::Value>> {
    let imported = state.actions.import_json(&body)?;
    Ok(Json(serde_json::json!({ "imported": imported })))
}

#[derive(Deserialize)]
struct ExportQuery {
    group: Option<String>,
}

/// GET /api/actions/export?group=… — always a bare JSON array.
async fn export_actions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let json = state.actions.export_json(query.group.as_deref())?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        json,
    ))
}
