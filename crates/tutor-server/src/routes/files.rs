//! Word-list file routes — file CRUD, paged words, translations, review.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::routes::ApiResult;
use crate::state::AppState;
use tutor_store::{RenderingFormat, Word, PAGE_SIZE};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/files", get(list_files).post(add_file))
        .route("/files/{id}", get(get_file).delete(delete_file))
        .route("/files/{id}/name", put(rename_file))
        .route("/files/{id}/words", get(load_words).post(add_word).put(replace_words))
        .route("/files/{id}/words/{idx}", put(update_word).delete(delete_word))
        .route(
            "/files/{id}/words/{idx}/translations",
            get(list_translations),
        )
        .route(
            "/files/{id}/words/{idx}/translations/{action}",
            put(upsert_translation).delete(delete_translation),
        )
        .route("/files/{id}/review", get(words_to_review))
        .route("/categories", get(list_categories))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewFile {
    name: String,
    category: String,
    #[serde(default)]
    words: Vec<Word>,
}

#[derive(Deserialize)]
struct CategoryFilter {
    category: Option<String>,
}

/// GET /api/files — file summaries, optionally filtered by category.
async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CategoryFilter>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut files = state.words.fetch_files_without_words()?;
    if let Some(category) = filter.category {
        files.retain(|f| f.category == category);
    }
    Ok(Json(serde_json::json!({
        "files": files,
        "total": files.len(),
    })))
}

async fn add_file(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewFile>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = state.words.add_file(&req.name, &req.category, &req.words)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<tutor_store::SavedFile>> {
    Ok(Json(state.words.fetch_file_details_by_id(id)?))
}

async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    let deleted = state.words.delete_file(id)?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

#[derive(Deserialize)]
struct Rename {
    name: String,
}

async fn rename_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<Rename>,
) -> ApiResult<Json<serde_json::Value>> {
    state.words.rename_file(id, &req.name)?;
    Ok(Json(serde_json::json!({ "id": id, "name": req.name })))
}

#[derive(Deserialize)]
struct PageQuery {
    #[serde(default = "default_page")]
    page: usize,
}

fn default_page() -> usize {
    1
}

/// GET /api/files/{id}/words?page=N — one fixed-size page, 1-based.
async fn load_words(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let words = state.words.load_words_by_page(id, query.page)?;
    let total = state.words.file_length_by_id(id)?;
    Ok(Json(serde_json::json!({
        "words": words,
        "page": query.page,
        "pageSize": PAGE_SIZE,
        "total": total,
    })))
}

async fn replace_words(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(words): Json<Vec<Word>>,
) -> ApiResult<Json<serde_json::Value>> {
    state.words.update_file_words(id, &words)?;
    Ok(Json(serde_json::json!({ "id": id, "total": words.len() })))
}

async fn add_word(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(word): Json<Word>,
) -> ApiResult<Json<serde_json::Value>> {
    let idx = state.words.append_word(id, word)?;
    Ok(Json(serde_json::json!({ "idx": idx })))
}

async fn update_word(
    State(state): State<Arc<AppState>>,
    Path((id, idx)): Path<(i64, i64)>,
    Json(word): Json<Word>,
) -> ApiResult<Json<Vec<Word>>> {
    Ok(Json(state.words.update_word_in_file(id, idx, word)?))
}

async fn delete_word(
    State(state): State<Arc<AppState>>,
    Path((id, idx)): Path<(i64, i64)>,
) -> ApiResult<Json<serde_json::Value>> {
    state.words.delete_word_from_file(id, idx)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslationUpdate {
    word_text: String,
    text: String,
    #[serde(default)]
    format: RenderingFormat,
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
}

/// PUT /api/files/{id}/words/{idx}/translations/{action} — overwrite one
/// action's answer; creates the word when the idx is unknown.
async fn upsert_translation(
    State(state): State<Arc<AppState>>,
    Path((id, idx, action)): Path<(i64, i64, String)>,
    Json(req): Json<TranslationUpdate>,
) -> ApiResult<Json<serde_json::Value>> {
    let idx = state.words.add_or_update_translation_in_word(
        id,
        idx,
        &action,
        &req.word_text,
        &req.text,
        req.format,
        req.message_id,
        req.conversation_id,
    )?;
    Ok(Json(serde_json::json!({ "idx": idx })))
}

async fn delete_translation(
    State(state): State<Arc<AppState>>,
    Path((id, idx, action)): Path<(i64, i64, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    state.words.delete_translation_from_word(id, idx, &action)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn list_translations(
    State(state): State<Arc<AppState>>,
    Path((id, idx)): Path<(i64, i64)>,
) -> ApiResult<Json<tutor_store::Answers>> {
    Ok(Json(state.words.translations_by_word_idx(id, idx)?))
}

async fn words_to_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Word>>> {
    Ok(Json(state.words.words_to_review_by_file_id(id)?))
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.words.list_categories()?))
}
