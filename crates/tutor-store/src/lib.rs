//! Tutor Store — SQLite-backed persistence for word-list files and actions,
//! plus the pure review scheduler.

pub mod actions;
pub mod review;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use actions::{export_actions_json, parse_actions_json, ActionStore};
pub use review::{mark_word_reviewed, next_review_date, words_due_for_review};
pub use sqlite::{WordStore, PAGE_SIZE};
pub use types::*;
