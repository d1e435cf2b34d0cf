//! Session state snapshot types.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use tutor_store::{Action, Answers, ConversationMessage, FileSummary, Word};

/// Categories present on a fresh profile.
pub const DEFAULT_CATEGORIES: [&str; 5] = ["单词", "表达", "语法", "默认", "学习"];

/// Category whose files are loaded by review due date instead of by page.
pub const REVIEW_CATEGORY: &str = "Review";

/// Category collecting date-named lookup history files.
pub const HISTORY_CATEGORY: &str = "History";

/// The coordinator's working copy. Mutated only through
/// [`crate::TutorSession`] operations, after the corresponding store write
/// has succeeded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub current_file_id: Option<i64>,
    /// Current page (or review slice) of the current file's words.
    pub words: Vec<Word>,
    pub current_page: usize,
    pub total_pages: usize,
    /// Files of the selected category, without word payloads.
    pub files: Vec<FileSummary>,
    pub categories: Vec<String>,
    pub selected_category: String,
    pub selected_word: Option<Word>,
    pub selected_action: Option<Action>,
    /// Answers of the selected word, mirrored for the UI.
    pub answers: Answers,
    /// Last selected word idx per file, for resumability.
    pub current_word_positions: HashMap<i64, i64>,
    /// Transient conversation buffer bridged to and from word answers.
    pub conversation_history: Vec<ConversationMessage>,
    /// Answer key the conversation buffer belongs to.
    pub conversation_key: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            current_file_id: None,
            words: Vec::new(),
            current_page: 1,
            total_pages: 0,
            files: Vec::new(),
            categories: DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            selected_category: "默认".to_string(),
            selected_word: None,
            selected_action: None,
            answers: Answers::new(),
            current_word_positions: HashMap::new(),
            conversation_history: Vec::new(),
            conversation_key: None,
        }
    }
}

/// Group actions by their group tags, preserving action order.
pub fn action_groups(actions: &[Action]) -> BTreeMap<String, Vec<Action>> {
    let mut groups: BTreeMap<String, Vec<Action>> = BTreeMap::new();
    for action in actions {
        for group in &action.groups {
            groups.entry(group.clone()).or_default().push(action.clone());
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str, groups: &[&str]) -> Action {
        Action {
            id: 0,
            name: name.to_string(),
            icon: None,
            groups: groups.iter().map(|g| g.to_string()).collect(),
            role_prompt: String::new(),
            command_prompt: String::new(),
            model: None,
            output_rendering_format: Default::default(),
            mode: Default::default(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_action_groups_fan_out_by_tag() {
        let actions = vec![
            action("Translate", &["默认", "单词"]),
            action("Grammar", &["语法"]),
            action("Explain", &["默认"]),
        ];

        let groups = action_groups(&actions);
        let names: Vec<&str> = groups["默认"].iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Translate", "Explain"]);
        assert_eq!(groups["语法"].len(), 1);
        assert_eq!(groups["单词"].len(), 1);
    }

    #[test]
    fn test_default_state() {
        let state = SessionState::default();
        assert_eq!(state.selected_category, "默认");
        assert_eq!(state.categories.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(state.current_page, 1);
        assert!(state.words.is_empty());
    }
}
