//! Session routes — the sidebar's working state, one session per server.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::routes::ApiResult;
use crate::state::AppState;
use tutor_session::SessionState;
use tutor_store::{Answer, Word};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/session", get(get_state))
        .route("/session/reset", post(reset))
        .route("/session/category", post(select_category))
        .route("/session/categories", post(add_category))
        .route("/session/categories/{name}", delete(delete_category))
        .route("/session/file/{id}", post(select_file))
        .route("/session/file/{id}/page/{page}", post(load_page))
        .route("/session/word", post(select_word))
        .route("/session/action/{id}", post(select_action))
        .route("/session/word/text", put(update_word_text))
        .route("/session/words", post(add_word))
        .route("/session/search", get(search_word))
        .route("/session/answers/{key}", put(update_answer))
        .route("/session/review", post(review_word))
        .route("/session/history", post(collect_to_history))
        .route(
            "/session/conversation",
            get(get_conversation).post(add_message).delete(clear_conversation),
        )
        .route("/session/conversation/save/{key}", post(save_conversation))
        .route("/session/conversation/load/{key}", post(load_conversation))
}

async fn get_state(State(state): State<Arc<AppState>>) -> Json<SessionState> {
    Json(state.session.state())
}

async fn reset(State(state): State<Arc<AppState>>) -> Json<SessionState> {
    state.session.reset();
    Json(state.session.state())
}

#[derive(Deserialize)]
struct CategorySelect {
    category: String,
}

async fn select_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CategorySelect>,
) -> ApiResult<Json<SessionState>> {
    state.session.select_category(&req.category)?;
    Ok(Json(state.session.state()))
}

#[derive(Deserialize)]
struct CategoryName {
    name: String,
}

async fn add_category(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CategoryName>,
) -> Json<SessionState> {
    state.session.add_category(&req.name);
    Json(state.session.state())
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<SessionState>> {
    state.session.delete_category(&name)?;
    Ok(Json(state.session.state()))
}

async fn select_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SessionState>> {
    state.session.select_file(id)?;
    Ok(Json(state.session.state()))
}

async fn load_page(
    State(state): State<Arc<AppState>>,
    Path((id, page)): Path<(i64, usize)>,
) -> ApiResult<Json<SessionState>> {
    state.session.load_words(id, page)?;
    Ok(Json(state.session.state()))
}

async fn select_word(
    State(state): State<Arc<AppState>>,
    Json(word): Json<Word>,
) -> Json<SessionState> {
    state.session.select_word(word);
    Json(state.session.state())
}

async fn select_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SessionState>> {
    let action = state.actions.get(id)?;
    state.session.select_action(action);
    Ok(Json(state.session.state()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewWord {
    text: String,
    file_name: String,
}

async fn add_word(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewWord>,
) -> ApiResult<Json<serde_json::Value>> {
    let (file_id, idx) = state.session.add_word_to_file(&req.text, &req.file_name)?;
    Ok(Json(serde_json::json!({ "fileId": file_id, "idx": idx })))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

async fn search_word(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Word>> {
    Ok(Json(state.session.search_word(&query.q)?))
}

#[derive(Deserialize)]
struct WordText {
    text: String,
}

async fn update_word_text(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WordText>,
) -> ApiResult<Json<SessionState>> {
    state.session.update_selected_word_text(&req.text)?;
    Ok(Json(state.session.state()))
}

async fn update_answer(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Json(answer): Json<Answer>,
) -> ApiResult<Json<SessionState>> {
    state.session.update_word_answer(&key, answer)?;
    Ok(Json(state.session.state()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    file_name: String,
    category: String,
    #[serde(default)]
    forget: bool,
}

async fn review_word(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<SessionState>> {
    state
        .session
        .add_word_to_learning_file(&req.file_name, &req.category, req.forget)?;
    Ok(Json(state.session.state()))
}

async fn collect_to_history(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<serde_json::Value>> {
    let (file_id, idx) = state.session.add_word_to_history_file()?;
    Ok(Json(serde_json::json!({ "fileId": file_id, "idx": idx })))
}

async fn get_conversation(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<tutor_store::ConversationMessage>> {
    Json(state.session.get_conversation_messages())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewMessage {
    role: String,
    content: String,
    #[serde(default)]
    message_id: Option<String>,
}

async fn add_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewMessage>,
) -> Json<serde_json::Value> {
    let id = state
        .session
        .add_message_to_history(&req.role, &req.content, req.message_id);
    Json(serde_json::json!({ "messageId": id }))
}

async fn clear_conversation(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    state.session.clear_conversation();
    Json(serde_json::json!({ "cleared": true }))
}

async fn save_conversation(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<SessionState>> {
    state.session.save_conversation_to_answer(&key)?;
    Ok(Json(state.session.state()))
}

async fn load_conversation(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<Vec<tutor_store::ConversationMessage>>> {
    state.session.load_conversation_from_answer(&key)?;
    Ok(Json(state.session.get_conversation_messages()))
}
