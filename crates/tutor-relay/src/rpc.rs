//! Typed RPC dispatch for the background services.
//!
//! The original surface was `{type, method, args}` resolved by reflection
//! against a service object. Here the method set is a closed tagged union:
//! an unknown service or method fails at deserialization with a `Dispatch`
//! error instead of being silently dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tutor_core::{Error, Result};
use tutor_store::actions::ActionInput;
use tutor_store::{next_review_date, ActionStore, RenderingFormat, Word, WordStore};

/// One RPC call: a service selector plus a method variant.
#[derive(Debug, Deserialize)]
#[serde(tag = "service", rename_all = "lowercase")]
pub enum RpcRequest {
    File {
        #[serde(flatten)]
        method: FileMethod,
    },
    Action {
        #[serde(flatten)]
        method: ActionMethod,
    },
}

/// File-service methods.
#[derive(Debug, Deserialize)]
#[serde(
    tag = "method",
    content = "args",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum FileMethod {
    AddFile {
        name: String,
        category: String,
        #[serde(default)]
        words: Vec<Word>,
    },
    UpdateFileWords {
        file_id: i64,
        words: Vec<Word>,
    },
    DeleteFile {
        file_id: i64,
    },
    FetchFileDetailsById {
        file_id: i64,
    },
    FetchAllFiles,
    FetchFilesWithoutWords,
    FetchFilesByCategory {
        category: String,
    },
    LoadWordsByPage {
        file_id: i64,
        page: usize,
    },
    AddWordToFile {
        file_id: i64,
        word: Word,
    },
    UpdateWordInFile {
        file_id: i64,
        idx: i64,
        word: Word,
    },
    DeleteWordFromFile {
        file_id: i64,
        idx: i64,
    },
    AddOrUpdateTranslationInWord {
        file_id: i64,
        word_idx: i64,
        action_name: String,
        word_text: String,
        text: String,
        #[serde(default)]
        format: RenderingFormat,
        #[serde(default)]
        message_id: Option<String>,
        #[serde(default)]
        conversation_id: Option<String>,
    },
    DeleteTranslationFromWord {
        file_id: i64,
        word_idx: i64,
        action_name: String,
    },
    TranslationsByWordIdx {
        file_id: i64,
        word_idx: i64,
    },
    GetNextReviewDate {
        last_reviewed: DateTime<Utc>,
        review_count: usize,
    },
    WordsToReview {
        file_id: i64,
    },
    FileLengthByName {
        category: String,
        name: String,
    },
    TotalWordCount,
}

/// Action-service methods.
#[derive(Debug, Deserialize)]
#[serde(
    tag = "method",
    content = "args",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ActionMethod {
    Create { input: ActionInput },
    Update { id: i64, input: ActionInput },
    Get { id: i64 },
    List,
    Delete { id: i64 },
    ImportJson { json: String },
    ExportJson { group: Option<String> },
}

/// Successful dispatch result.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub result: serde_json::Value,
}

/// Parse a raw JSON payload into a request. Any shape mismatch is a
/// `Dispatch` error.
pub fn parse_request(value: serde_json::Value) -> Result<RpcRequest> {
    serde_json::from_value(value).map_err(|e| Error::Dispatch(e.to_string()))
}

/// Routes typed requests to the injected stores.
pub struct Dispatcher {
    files: Arc<WordStore>,
    actions: Arc<ActionStore>,
}

impl Dispatcher {
    pub fn new(files: Arc<WordStore>, actions: Arc<ActionStore>) -> Self {
        Self { files, actions }
    }

    pub fn dispatch(&self, request: RpcRequest) -> Result<RpcResponse> {
        let result = match request {
            RpcRequest::File { method } => self.dispatch_file(method)?,
            RpcRequest::Action { method } => self.dispatch_action(method)?,
        };
        Ok(RpcResponse { result })
    }

    fn dispatch_file(&self, method: FileMethod) -> Result<serde_json::Value> {
        debug!("dispatching file method: {:?}", method);
        let value = match method {
            FileMethod::AddFile {
                name,
                category,
                words,
            } => json(self.files.add_file(&name, &category, &words)?)?,
            FileMethod::UpdateFileWords { file_id, words } => {
                self.files.update_file_words(file_id, &words)?;
                serde_json::Value::Null
            }
            FileMethod::DeleteFile { file_id } => json(self.files.delete_file(file_id)?)?,
            FileMethod::FetchFileDetailsById { file_id } => {
                json(self.files.fetch_file_details_by_id(file_id)?)?
            }
            FileMethod::FetchAllFiles => json(self.files.fetch_all_files()?)?,
            FileMethod::FetchFilesWithoutWords => json(self.files.fetch_files_without_words()?)?,
            FileMethod::FetchFilesByCategory { category } => {
                json(self.files.fetch_files_by_category(&category)?)?
            }
            FileMethod::LoadWordsByPage { file_id, page } => {
                json(self.files.load_words_by_page(file_id, page)?)?
            }
            FileMethod::AddWordToFile { file_id, word } => {
                json(self.files.append_word(file_id, word)?)?
            }
            FileMethod::UpdateWordInFile { file_id, idx, word } => {
                json(self.files.update_word_in_file(file_id, idx, word)?)?
            }
            FileMethod::DeleteWordFromFile { file_id, idx } => {
                self.files.delete_word_from_file(file_id, idx)?;
                serde_json::Value::Null
            }
            FileMethod::AddOrUpdateTranslationInWord {
                file_id,
                word_idx,
                action_name,
                word_text,
                text,
                format,
                message_id,
                conversation_id,
            } => json(self.files.add_or_update_translation_in_word(
                file_id,
                word_idx,
                &action_name,
                &word_text,
                &text,
                format,
                message_id,
                conversation_id,
            )?)?,
            FileMethod::DeleteTranslationFromWord {
                file_id,
                word_idx,
                action_name,
            } => {
                self.files
                    .delete_translation_from_word(file_id, word_idx, &action_name)?;
                serde_json::Value::Null
            }
            FileMethod::TranslationsByWordIdx { file_id, word_idx } => {
                json(self.files.translations_by_word_idx(file_id, word_idx)?)?
            }
            FileMethod::GetNextReviewDate {
                last_reviewed,
                review_count,
            } => json(next_review_date(last_reviewed, review_count))?,
            FileMethod::WordsToReview { file_id } => {
                json(self.files.words_to_review_by_file_id(file_id)?)?
            }
            FileMethod::FileLengthByName { category, name } => {
                json(self.files.file_length_by_name(&category, &name)?)?
            }
            FileMethod::TotalWordCount => json(self.files.total_word_count()?)?,
        };
        Ok(value)
    }

    fn dispatch_action(&self, method: ActionMethod) -> Result<serde_json::Value> {
        debug!("dispatching action method: {:?}", method);
        let value = match method {
            ActionMethod::Create { input } => json(self.actions.create(&input)?)?,
            ActionMethod::Update { id, input } => {
                self.actions.update(id, &input)?;
                serde_json::Value::Null
            }
            ActionMethod::Get { id } => json(self.actions.get(id)?)?,
            ActionMethod::List => json(self.actions.list()?)?,
            ActionMethod::Delete { id } => json(self.actions.delete(id)?)?,
            ActionMethod::ImportJson { json: payload } => json(self.actions.import_json(&payload)?)?,
            ActionMethod::ExportJson { group } => json(self.actions.export_json(group.as_deref())?)?,
        };
        Ok(value)
    }
}

fn json<T: Serialize>(value: T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}
