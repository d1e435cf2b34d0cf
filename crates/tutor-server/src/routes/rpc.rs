//! Typed RPC endpoint for the background services.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::routes::ApiResult;
use crate::state::AppState;
use tutor_relay::rpc::parse_request;
use tutor_relay::RpcResponse;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/rpc", post(dispatch))
}

/// POST /api/rpc — `{service, method, args}`; unknown shapes are rejected
/// at deserialization with a 400.
async fn dispatch(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<RpcResponse>> {
    let request = parse_request(payload)?;
    Ok(Json(state.dispatcher.dispatch(request)?))
}
