//! Tutor Session — the in-memory working copy of the current file, word,
//! action, and conversation, kept in sync with the word store.
//!
//! Every mutating operation persists first and only then updates the
//! in-memory state, so a failed store call never leaves the session ahead
//! of the database.

pub mod session;
pub mod state;

pub use session::TutorSession;
pub use state::{action_groups, SessionState, DEFAULT_CATEGORIES, HISTORY_CATEGORY, REVIEW_CATEGORY};
