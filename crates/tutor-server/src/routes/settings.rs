//! Settings routes — read with defaults backfilled, partial update.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::routes::ApiResult;
use crate::state::AppState;
use tutor_core::Settings;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/settings", get(get_settings).put(update_settings))
}

async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Settings> {
    Json(state.settings.read().clone())
}

/// PUT /api/settings — merge a partial JSON object into the settings
/// record, re-apply the cross-key defaults, and persist.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<serde_json::Value>,
) -> ApiResult<Json<Settings>> {
    let mut settings = state.settings.write();
    settings.merge_update(&update)?;
    settings.save(&state.config.data_paths.settings_file)?;
    Ok(Json(settings.clone()))
}
