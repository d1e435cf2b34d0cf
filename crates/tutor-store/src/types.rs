//! Data types for word-list files, words, answers, and actions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an answer's text should be rendered by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderingFormat {
    Text,
    #[default]
    Markdown,
    Latex,
}

/// One message of a saved conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
    pub message_id: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Success,
    Error,
}

/// A follow-up Q&A attached to an answer (or directly to a word, for
/// sentence answers). Text edits append rather than overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpAnswer {
    pub idx: i64,
    pub text: String,
    #[serde(default)]
    pub question: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation_messages: Vec<ConversationMessage>,
}

/// The stored result of applying one action to a word's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub text: String,
    #[serde(default)]
    pub format: RenderingFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub follow_up_answers: Vec<FollowUpAnswer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conversation_messages: Vec<ConversationMessage>,
}

/// Per-action answers, keyed by action name. The key is a weak reference:
/// renaming or deleting an action leaves its answers in place.
pub type Answers = BTreeMap<String, Answer>;

/// One learnable entry within a file.
///
/// `idx` is 1-based, unique within its file, and stable-gapped: it is
/// assigned as `max(existing idx) + 1` and the list is never re-packed
/// on delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub idx: i64,
    pub text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub answers: Answers,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sentence_answers: Vec<FollowUpAnswer>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_count: i64,
}

impl Word {
    /// A fresh word with no answers or review history.
    pub fn new(idx: i64, text: impl Into<String>) -> Self {
        Self {
            idx,
            text: text.into(),
            answers: BTreeMap::new(),
            sentence_answers: Vec::new(),
            is_new: false,
            last_reviewed: None,
            next_review: None,
            review_count: 0,
        }
    }
}

/// A named, categorized, ordered collection of words — the persistence
/// unit. The file's `words` vector is the sole owner of its words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFile {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub words: Vec<Word>,
}

/// File listing entry without the word payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: i64,
    pub name: String,
    pub category: String,
}

/// Whether an action shipped with the product or was user-created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ActionMode {
    #[default]
    BuiltIn,
    User,
}

impl ActionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionMode::BuiltIn => "built-in",
            ActionMode::User => "user",
        }
    }
}

impl std::str::FromStr for ActionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "built-in" => Ok(ActionMode::BuiltIn),
            "user" => Ok(ActionMode::User),
            _ => Err(()),
        }
    }
}

/// A named prompt template bound to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Store-assigned; import payloads may omit it (upsert is by name).
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(default)]
    pub role_prompt: String,
    #[serde(default)]
    pub command_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub output_rendering_format: RenderingFormat,
    #[serde(default)]
    pub mode: ActionMode,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}
