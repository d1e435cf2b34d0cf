//! The session coordinator.
//!
//! All operations follow the same shape: read the current state, perform
//! the store write, and only on success fold the result back into the
//! in-memory state. Errors propagate typed to the caller.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use tutor_core::{Error, Result};
use tutor_store::{
    mark_word_reviewed, Answer, Answers, ConversationMessage, FollowUpAnswer, MessageStatus, Word,
    WordStore, PAGE_SIZE,
};

use crate::state::{SessionState, HISTORY_CATEGORY, REVIEW_CATEGORY};

pub struct TutorSession {
    store: Arc<WordStore>,
    state: RwLock<SessionState>,
}

impl TutorSession {
    pub fn new(store: Arc<WordStore>) -> Self {
        Self {
            store,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Drop all session state back to a fresh default.
    pub fn reset(&self) {
        *self.state.write() = SessionState::default();
        info!("session reset");
    }

    // ---------------------------------------------------------------
    // Files and categories
    // ---------------------------------------------------------------

    /// Switch the working category and reload its file listing.
    pub fn select_category(&self, category: &str) -> Result<()> {
        let files = self.files_in_category(category)?;
        let mut state = self.state.write();
        state.selected_category = category.to_string();
        state.files = files;
        state.current_file_id = None;
        state.words.clear();
        state.selected_word = None;
        state.answers.clear();
        Ok(())
    }

    pub fn add_category(&self, name: &str) {
        let mut state = self.state.write();
        if !state.categories.iter().any(|c| c == name) {
            state.categories.push(name.to_string());
        }
    }

    /// Remove a category from the session list. Files keep their stored
    /// category string; the selection falls back to the default category.
    pub fn delete_category(&self, name: &str) -> Result<()> {
        let mut state = self.state.write();
        state.categories.retain(|c| c != name);
        if state.selected_category == name {
            state.selected_category = "默认".to_string();
            let category = state.selected_category.clone();
            drop(state);
            return self.select_category(&category);
        }
        Ok(())
    }

    /// Focus a file, restoring the last selected word and its page.
    pub fn select_file(&self, file_id: i64) -> Result<()> {
        let file = self.store.fetch_file_details_by_id(file_id)?;
        let saved_idx = self.state.read().current_word_positions.get(&file_id).copied();

        // The page is derived from the saved word's position in the full
        // list, not from its idx (idx values may have gaps).
        let page = saved_idx
            .and_then(|idx| file.words.iter().position(|w| w.idx == idx))
            .map(|pos| pos / PAGE_SIZE + 1)
            .unwrap_or(1);

        // A cross-category jump also swaps the file listing.
        let category_changed = self.state.read().selected_category != file.category;
        let files = if category_changed {
            Some(self.files_in_category(&file.category)?)
        } else {
            None
        };

        {
            let mut state = self.state.write();
            state.current_file_id = Some(file.id);
            state.selected_category = file.category.clone();
            if let Some(files) = files {
                state.files = files;
            }
        }
        self.load_words(file_id, page)?;

        let mut state = self.state.write();
        let selected = saved_idx
            .and_then(|idx| state.words.iter().find(|w| w.idx == idx).cloned())
            .or_else(|| state.words.first().cloned());
        state.answers = selected
            .as_ref()
            .map(|w| w.answers.clone())
            .unwrap_or_default();
        state.selected_word = selected;
        Ok(())
    }

    /// Load one page of a file's words into the session. In the review
    /// category the page is the full due set instead.
    pub fn load_words(&self, file_id: i64, page: usize) -> Result<()> {
        let in_review = self.state.read().selected_category == REVIEW_CATEGORY;

        let (words, current_page, total_pages) = if in_review {
            let due = self.store.words_to_review_by_file_id(file_id)?;
            (due, 1, 1)
        } else {
            let words = self.store.load_words_by_page(file_id, page)?;
            let total = self.store.file_length_by_id(file_id)?;
            (words, page, total.div_ceil(PAGE_SIZE))
        };

        let mut state = self.state.write();
        state.current_file_id = Some(file_id);
        state.words = words;
        state.current_page = current_page;
        state.total_pages = total_pages;
        Ok(())
    }

    /// Delete a file and refocus on the first remaining file of the
    /// category, if any.
    pub fn delete_file(&self, file_id: i64) -> Result<()> {
        self.store.delete_file(file_id)?;

        let category = self.state.read().selected_category.clone();
        let files = self.files_in_category(&category)?;
        let next = files.first().map(|f| f.id);

        {
            let mut state = self.state.write();
            state.files = files;
            state.current_word_positions.remove(&file_id);
            if state.current_file_id == Some(file_id) {
                state.current_file_id = None;
                state.words.clear();
                state.selected_word = None;
                state.answers.clear();
            }
        }

        if let Some(next_id) = next {
            if self.state.read().current_file_id.is_none() {
                self.select_file(next_id)?;
            }
        }
        Ok(())
    }

    /// Find a file by name in the given category, creating it when absent.
    pub fn get_or_create_target_file(&self, name: &str, category: &str) -> Result<i64> {
        if let Some(file) = self.store.find_file_by_name(category, name)? {
            return Ok(file.id);
        }
        let id = self.store.add_file(name, category, &[])?;
        debug!("created file {name:?} in category {category:?} (id={id})");

        let mut state = self.state.write();
        if state.selected_category == category {
            state.files.push(tutor_store::FileSummary {
                id,
                name: name.to_string(),
                category: category.to_string(),
            });
        }
        Ok(id)
    }

    // ---------------------------------------------------------------
    // Words
    // ---------------------------------------------------------------

    /// Select a word, remembering its position for the current file.
    pub fn select_word(&self, word: Word) {
        let mut state = self.state.write();
        if let Some(file_id) = state.current_file_id {
            state.current_word_positions.insert(file_id, word.idx);
        }
        state.answers = word.answers.clone();
        state.selected_word = Some(word);
    }

    /// Add a word to the named file in the current category, creating the
    /// file on demand. Returns the file ID and the assigned idx.
    pub fn add_word_to_file(&self, text: &str, file_name: &str) -> Result<(i64, i64)> {
        let category = self.state.read().selected_category.clone();
        let file_id = self.get_or_create_target_file(file_name, &category)?;

        let mut word = Word::new(0, text);
        word.is_new = true;
        word.last_reviewed = Some(Utc::now());
        let idx = self.store.append_word(file_id, word.clone())?;
        word.idx = idx;

        let mut state = self.state.write();
        if state.current_file_id == Some(file_id) && state.words.len() < PAGE_SIZE {
            // The word lands on the visible page only if there is room.
            state.words.push(word);
        }
        Ok((file_id, idx))
    }

    /// Find the first word in the current file whose text contains `query`.
    pub fn search_word(&self, query: &str) -> Result<Word> {
        let file_id = self.current_file_id()?;
        let words = self.store.load_words_by_file_id(file_id)?;
        words
            .into_iter()
            .find(|w| w.text.contains(query))
            .ok_or_else(|| Error::NotFound(format!("word matching {query:?}")))
    }

    /// Rewrite the selected word's text.
    pub fn update_selected_word_text(&self, text: &str) -> Result<()> {
        let (file_id, mut word) = self.current_selection()?;
        word.text = text.to_string();
        self.persist_selected_word(file_id, word)
    }

    // ---------------------------------------------------------------
    // Answers
    // ---------------------------------------------------------------

    /// Merge one answer into the selected word under `key` and persist.
    /// Re-saving the same answer is a plain overwrite.
    pub fn update_word_answer(&self, key: &str, answer: Answer) -> Result<()> {
        let (file_id, mut word) = self.current_selection()?;
        word.answers.insert(key.to_string(), answer);
        self.persist_selected_word(file_id, word)
    }

    /// Merge a batch of answers into the selected word and persist once.
    pub fn update_word_answers(&self, answers: Answers) -> Result<()> {
        let (file_id, mut word) = self.current_selection()?;
        for (key, answer) in answers {
            word.answers.insert(key, answer);
        }
        self.persist_selected_word(file_id, word)
    }

    /// Append-merge a follow-up answer under one of the selected word's
    /// answers. New text that repeats the stored text is deduplicated;
    /// genuinely new content is appended after a blank line.
    pub fn update_follow_up_answer(
        &self,
        key: &str,
        follow_up_idx: i64,
        text: &str,
        question: &str,
    ) -> Result<()> {
        let (file_id, mut word) = self.current_selection()?;
        let answer = word
            .answers
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("answer {key:?}")))?;
        merge_follow_up(&mut answer.follow_up_answers, follow_up_idx, text, question);
        self.persist_selected_word(file_id, word)
    }

    /// Append-merge a sentence-level follow-up directly on the word.
    pub fn edit_sentence_answer(&self, follow_up_idx: i64, text: &str, question: &str) -> Result<()> {
        let (file_id, mut word) = self.current_selection()?;
        merge_follow_up(&mut word.sentence_answers, follow_up_idx, text, question);
        self.persist_selected_word(file_id, word)
    }

    // ---------------------------------------------------------------
    // Review flow
    // ---------------------------------------------------------------

    /// Mark the selected word reviewed and file it under `file_name` in
    /// `category`, creating the file on demand. With `forget` the word is
    /// rescheduled for immediate review with a count of 1 instead.
    ///
    /// In the review category the word is updated in place and the session
    /// advances to the next due word.
    pub fn add_word_to_learning_file(
        &self,
        file_name: &str,
        category: &str,
        forget: bool,
    ) -> Result<()> {
        let (file_id, word) = self.current_selection()?;
        let now = Utc::now();

        let reviewed = if forget {
            let mut w = word.clone();
            w.last_reviewed = Some(now);
            w.next_review = Some(now);
            w.review_count = 1;
            w
        } else {
            mark_word_reviewed(&word, now)
        };

        let in_review = self.state.read().selected_category == REVIEW_CATEGORY;
        if in_review {
            self.store
                .update_word_in_file(file_id, reviewed.idx, reviewed.clone())?;
            let due = self.store.words_to_review_by_file_id(file_id)?;

            let mut state = self.state.write();
            let selected = due.first().cloned();
            state.words = due;
            state.answers = selected
                .as_ref()
                .map(|w| w.answers.clone())
                .unwrap_or_default();
            state.selected_word = selected;
            return Ok(());
        }

        let target_id = self.get_or_create_target_file(file_name, category)?;
        self.upsert_word_by_text(target_id, reviewed.clone())?;
        if target_id != file_id {
            self.store
                .update_word_in_file(file_id, reviewed.idx, reviewed.clone())?;
        }
        self.apply_selected_word(file_id, reviewed);
        Ok(())
    }

    /// File the selected word into today's history file (`YYYY/MM/DD` in
    /// the history category) with its review schedule cleared.
    pub fn add_word_to_history_file(&self) -> Result<(i64, i64)> {
        let (_, word) = self.current_selection()?;
        let name = Utc::now().format("%Y/%m/%d").to_string();
        let file_id = self.get_or_create_target_file(&name, HISTORY_CATEGORY)?;

        let mut entry = word;
        entry.next_review = None;
        entry.last_reviewed = None;
        entry.review_count = 0;
        let idx = self.upsert_word_by_text(file_id, entry)?;
        Ok((file_id, idx))
    }

    // ---------------------------------------------------------------
    // Actions
    // ---------------------------------------------------------------

    pub fn select_action(&self, action: tutor_store::Action) {
        self.state.write().selected_action = Some(action);
    }

    // ---------------------------------------------------------------
    // Conversation bridging
    // ---------------------------------------------------------------

    /// Append a message to the transient conversation buffer. Returns the
    /// message ID (generated when the caller passes none).
    pub fn add_message_to_history(
        &self,
        role: &str,
        content: &str,
        message_id: Option<String>,
    ) -> String {
        let message_id = message_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let message = ConversationMessage {
            role: role.to_string(),
            content: content.to_string(),
            message_id: message_id.clone(),
            created_at: Utc::now().timestamp_millis(),
            status: None,
        };
        self.state.write().conversation_history.push(message);
        message_id
    }

    /// Append a message to a follow-up answer's transcript and persist.
    pub fn add_follow_up_message_to_history(
        &self,
        key: &str,
        follow_up_idx: i64,
        role: &str,
        content: &str,
    ) -> Result<String> {
        let (file_id, mut word) = self.current_selection()?;
        let answer = word
            .answers
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("answer {key:?}")))?;
        let follow_up = answer
            .follow_up_answers
            .iter_mut()
            .find(|f| f.idx == follow_up_idx)
            .ok_or_else(|| Error::NotFound(format!("follow-up {follow_up_idx}")))?;

        let message_id = Uuid::new_v4().to_string();
        follow_up.conversation_messages.push(ConversationMessage {
            role: role.to_string(),
            content: content.to_string(),
            message_id: message_id.clone(),
            created_at: Utc::now().timestamp_millis(),
            status: None,
        });
        self.persist_selected_word(file_id, word)?;
        Ok(message_id)
    }

    /// Persist the conversation buffer into the selected word's answer
    /// under `key`.
    pub fn save_conversation_to_answer(&self, key: &str) -> Result<()> {
        let (file_id, mut word) = self.current_selection()?;
        let history = self.state.read().conversation_history.clone();
        let answer = word
            .answers
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(format!("answer {key:?}")))?;
        answer.conversation_messages = history;
        self.persist_selected_word(file_id, word)?;
        self.state.write().conversation_key = Some(key.to_string());
        Ok(())
    }

    /// Replace the conversation buffer with the transcript stored under
    /// `key` on the selected word.
    pub fn load_conversation_from_answer(&self, key: &str) -> Result<()> {
        let (_, word) = self.current_selection()?;
        let messages = word
            .answers
            .get(key)
            .map(|a| a.conversation_messages.clone())
            .ok_or_else(|| Error::NotFound(format!("answer {key:?}")))?;

        let mut state = self.state.write();
        state.conversation_history = messages;
        state.conversation_key = Some(key.to_string());
        Ok(())
    }

    pub fn clear_conversation(&self) {
        let mut state = self.state.write();
        state.conversation_history.clear();
        state.conversation_key = None;
    }

    pub fn get_conversation_messages(&self) -> Vec<ConversationMessage> {
        self.state.read().conversation_history.clone()
    }

    /// Replace the content of a buffered message (streaming updates).
    pub fn update_message_content(&self, message_id: &str, content: &str) -> Result<()> {
        let mut state = self.state.write();
        let message = state
            .conversation_history
            .iter_mut()
            .find(|m| m.message_id == message_id)
            .ok_or_else(|| Error::NotFound(format!("message {message_id}")))?;
        message.content = content.to_string();
        Ok(())
    }

    pub fn update_message_status(&self, message_id: &str, status: MessageStatus) -> Result<()> {
        let mut state = self.state.write();
        let message = state
            .conversation_history
            .iter_mut()
            .find(|m| m.message_id == message_id)
            .ok_or_else(|| Error::NotFound(format!("message {message_id}")))?;
        message.status = Some(status);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn current_file_id(&self) -> Result<i64> {
        self.state
            .read()
            .current_file_id
            .ok_or_else(|| Error::Validation("no file selected".to_string()))
    }

    fn current_selection(&self) -> Result<(i64, Word)> {
        let state = self.state.read();
        let file_id = state
            .current_file_id
            .ok_or_else(|| Error::Validation("no file selected".to_string()))?;
        let word = state
            .selected_word
            .clone()
            .ok_or_else(|| Error::Validation("no word selected".to_string()))?;
        Ok((file_id, word))
    }

    /// Persist a replacement for the selected word, then mirror it into
    /// the in-memory page and answer views.
    fn persist_selected_word(&self, file_id: i64, word: Word) -> Result<()> {
        self.store.update_word_in_file(file_id, word.idx, word.clone())?;
        self.apply_selected_word(file_id, word);
        Ok(())
    }

    fn apply_selected_word(&self, file_id: i64, word: Word) {
        let mut state = self.state.write();
        if state.current_file_id == Some(file_id) {
            if let Some(slot) = state.words.iter_mut().find(|w| w.idx == word.idx) {
                *slot = word.clone();
            }
        }
        state.answers = word.answers.clone();
        state.selected_word = Some(word);
    }

    /// Update the word with matching text in `file_id`, or append it.
    /// Returns the idx it ended up under.
    fn upsert_word_by_text(&self, file_id: i64, word: Word) -> Result<i64> {
        let existing: Option<Word> = self
            .store
            .load_words_by_file_id(file_id)?
            .into_iter()
            .find(|w| w.text == word.text);

        match existing {
            Some(slot) => {
                let mut replacement = word;
                replacement.idx = slot.idx;
                self.store
                    .update_word_in_file(file_id, slot.idx, replacement)?;
                Ok(slot.idx)
            }
            None => self.store.append_word(file_id, word),
        }
    }

    fn files_in_category(&self, category: &str) -> Result<Vec<tutor_store::FileSummary>> {
        Ok(self
            .store
            .fetch_files_without_words()?
            .into_iter()
            .filter(|f| f.category == category)
            .collect())
    }
}

/// Append-merge `text` into the follow-up with `idx`, creating it when
/// absent. Existing text already contained in the incoming text is not
/// duplicated; new content joins after a blank line.
fn merge_follow_up(follow_ups: &mut Vec<FollowUpAnswer>, idx: i64, text: &str, question: &str) {
    let now = Utc::now();
    match follow_ups.iter_mut().find(|f| f.idx == idx) {
        Some(follow_up) => {
            follow_up.text = merge_append(&follow_up.text, text);
            if !question.is_empty() {
                follow_up.question = question.to_string();
            }
            follow_up.updated_at = now;
        }
        None => follow_ups.push(FollowUpAnswer {
            idx,
            text: text.trim().to_string(),
            question: question.to_string(),
            created_at: now,
            updated_at: now,
            conversation_messages: Vec::new(),
        }),
    }
}

fn merge_append(existing: &str, incoming: &str) -> String {
    if existing.is_empty() {
        return incoming.trim().to_string();
    }
    let new_content = incoming.replace(existing, "");
    let new_content = new_content.trim();
    if new_content.is_empty() {
        existing.to_string()
    } else {
        format!("{existing}\n\n{new_content}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_store::RenderingFormat;

    fn session() -> (TutorSession, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(WordStore::open(dir.path()).unwrap());
        (TutorSession::new(store), dir)
    }

    fn answer(text: &str) -> Answer {
        Answer {
            text: text.to_string(),
            format: RenderingFormat::Markdown,
            ..Answer::default()
        }
    }

    #[test]
    fn test_add_word_assigns_sequential_idx() {
        let (session, _dir) = session();

        let (file_id, idx1) = session.add_word_to_file("hello", "Day1").unwrap();
        let (same_id, idx2) = session.add_word_to_file("world", "Day1").unwrap();
        assert_eq!(file_id, same_id);
        assert_eq!(idx1, 1);
        assert_eq!(idx2, 2);
    }

    #[test]
    fn test_select_file_restores_word_position() {
        let (session, _dir) = session();
        let (file_id, _) = session.add_word_to_file("w1", "big").unwrap();
        for i in 2..=15 {
            session.add_word_to_file(&format!("w{i}"), "big").unwrap();
        }

        session.select_file(file_id).unwrap();
        let word12 = session.search_word("w12").unwrap();
        session.select_word(word12);

        // Re-selecting the file lands on the saved word's page (page 2).
        session.select_file(file_id).unwrap();
        let state = session.state();
        assert_eq!(state.current_page, 2);
        assert_eq!(state.total_pages, 2);
        assert_eq!(state.selected_word.unwrap().text, "w12");
    }

    #[test]
    fn test_select_file_across_categories_reloads_listing() {
        let (session, _dir) = session();
        session.add_word_to_file("a", "Default Notes").unwrap();
        let other = session
            .store
            .add_file("Study Set", "学习", &[Word::new(1, "b")])
            .unwrap();

        session.select_category("默认").unwrap();
        assert_eq!(session.state().files.len(), 1);

        session.select_file(other).unwrap();
        let state = session.state();
        assert_eq!(state.selected_category, "学习");
        assert_eq!(state.files.len(), 1);
        assert_eq!(state.files[0].name, "Study Set");
    }

    #[test]
    fn test_update_word_answer_persists_and_is_idempotent() {
        let (session, _dir) = session();
        let (file_id, _) = session.add_word_to_file("hello", "Day1").unwrap();
        session.select_file(file_id).unwrap();

        session.update_word_answer("Translate", answer("你好")).unwrap();
        session.update_word_answer("Translate", answer("你好")).unwrap();

        let store = &session.store;
        let answers = store.translations_by_word_idx(file_id, 1).unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers["Translate"].text, "你好");
        assert_eq!(session.state().answers["Translate"].text, "你好");
    }

    #[test]
    fn test_answer_update_requires_selection() {
        let (session, _dir) = session();
        assert!(matches!(
            session.update_word_answer("Translate", answer("x")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_follow_up_merge_appends_only_new_content() {
        let (session, _dir) = session();
        let (file_id, _) = session.add_word_to_file("hello", "Day1").unwrap();
        session.select_file(file_id).unwrap();
        session.update_word_answer("Explain", answer("base")).unwrap();

        session
            .update_follow_up_answer("Explain", 1, "first part", "why?")
            .unwrap();
        // An edit containing the stored text only contributes its tail.
        session
            .update_follow_up_answer("Explain", 1, "first part and more", "")
            .unwrap();

        let state = session.state();
        let follow_up = &state.answers["Explain"].follow_up_answers[0];
        assert_eq!(follow_up.text, "first part\n\nand more");
        assert_eq!(follow_up.question, "why?");

        // Re-sending identical text changes nothing.
        session
            .update_follow_up_answer("Explain", 1, "first part\n\nand more", "")
            .unwrap();
        let state = session.state();
        assert_eq!(
            state.answers["Explain"].follow_up_answers[0].text,
            "first part\n\nand more"
        );
    }

    #[test]
    fn test_sentence_answer_round_trip() {
        let (session, _dir) = session();
        let (file_id, _) = session.add_word_to_file("sentence", "Day1").unwrap();
        session.select_file(file_id).unwrap();

        session.edit_sentence_answer(1, "parsed", "structure?").unwrap();
        let word = session
            .store
            .load_words_by_file_id(file_id)
            .unwrap()
            .remove(0);
        assert_eq!(word.sentence_answers[0].text, "parsed");
        assert_eq!(word.sentence_answers[0].question, "structure?");
    }

    #[test]
    fn test_learning_file_relocation_schedules_review() {
        let (session, _dir) = session();
        let (file_id, _) = session.add_word_to_file("hello", "Day1").unwrap();
        session.select_file(file_id).unwrap();

        session.add_word_to_learning_file("Review Set", "学习", false).unwrap();

        let target = session
            .store
            .find_file_by_name("学习", "Review Set")
            .unwrap()
            .unwrap();
        assert_eq!(target.words.len(), 1);
        let relocated = &target.words[0];
        assert_eq!(relocated.text, "hello");
        assert_eq!(relocated.review_count, 1);
        assert!(relocated.next_review.is_some());

        // Reviewing again reuses the target slot instead of duplicating.
        session.add_word_to_learning_file("Review Set", "学习", false).unwrap();
        let target = session
            .store
            .find_file_by_name("学习", "Review Set")
            .unwrap()
            .unwrap();
        assert_eq!(target.words.len(), 1);
    }

    #[test]
    fn test_forget_resets_to_review_now() {
        let (session, _dir) = session();
        let (file_id, _) = session.add_word_to_file("hard", "Day1").unwrap();
        session.select_file(file_id).unwrap();
        session.add_word_to_learning_file("Set", "学习", false).unwrap();
        session.add_word_to_learning_file("Set", "学习", true).unwrap();

        let word = session.state().selected_word.unwrap();
        assert_eq!(word.review_count, 1);
        let next = word.next_review.unwrap();
        assert!(next <= Utc::now());
    }

    #[test]
    fn test_review_category_advances_to_next_due_word() {
        let (session, _dir) = session();
        let past = Utc::now() - chrono::Duration::days(1);
        let mut w1 = Word::new(1, "due1");
        w1.next_review = Some(past);
        let mut w2 = Word::new(2, "due2");
        w2.next_review = Some(past);
        let file_id = session
            .store
            .add_file("review", REVIEW_CATEGORY, &[w1, w2])
            .unwrap();

        session.select_category(REVIEW_CATEGORY).unwrap();
        session.select_file(file_id).unwrap();
        assert_eq!(session.state().words.len(), 2);

        session.add_word_to_learning_file("", "学习", false).unwrap();
        let state = session.state();
        assert_eq!(state.words.len(), 1);
        assert_eq!(state.selected_word.unwrap().text, "due2");
    }

    #[test]
    fn test_history_file_is_date_named_and_unscheduled() {
        let (session, _dir) = session();
        let (file_id, _) = session.add_word_to_file("noted", "Day1").unwrap();
        session.select_file(file_id).unwrap();
        session.add_word_to_learning_file("Set", "学习", false).unwrap();

        let (history_id, idx) = session.add_word_to_history_file().unwrap();
        let name = Utc::now().format("%Y/%m/%d").to_string();
        let file = session.store.fetch_file_details_by_id(history_id).unwrap();
        assert_eq!(file.name, name);
        assert_eq!(file.category, HISTORY_CATEGORY);

        let entry = file.words.iter().find(|w| w.idx == idx).unwrap();
        assert!(entry.next_review.is_none());
        assert_eq!(entry.review_count, 0);
    }

    #[test]
    fn test_conversation_save_and_load_round_trip() {
        let (session, _dir) = session();
        let (file_id, _) = session.add_word_to_file("hello", "Day1").unwrap();
        session.select_file(file_id).unwrap();
        session.update_word_answer("Chat", answer("start")).unwrap();

        let user_id = session.add_message_to_history("user", "what does it mean?", None);
        let assistant_id =
            session.add_message_to_history("assistant", "", Some("m-fixed".to_string()));
        assert_eq!(assistant_id, "m-fixed");

        session.update_message_content("m-fixed", "it is a greeting").unwrap();
        session
            .update_message_status("m-fixed", MessageStatus::Success)
            .unwrap();
        session.save_conversation_to_answer("Chat").unwrap();

        session.clear_conversation();
        assert!(session.get_conversation_messages().is_empty());

        // Reload from persistence through a fresh selection.
        session.select_file(file_id).unwrap();
        session.load_conversation_from_answer("Chat").unwrap();
        let messages = session.get_conversation_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_id, user_id);
        assert_eq!(messages[1].content, "it is a greeting");
        assert_eq!(messages[1].status, Some(MessageStatus::Success));
    }

    #[test]
    fn test_follow_up_message_attaches_to_transcript() {
        let (session, _dir) = session();
        let (file_id, _) = session.add_word_to_file("hello", "Day1").unwrap();
        session.select_file(file_id).unwrap();
        session.update_word_answer("Explain", answer("base")).unwrap();
        session.update_follow_up_answer("Explain", 1, "detail", "q").unwrap();

        session
            .add_follow_up_message_to_history("Explain", 1, "user", "more?")
            .unwrap();

        let word = session
            .store
            .load_words_by_file_id(file_id)
            .unwrap()
            .remove(0);
        let transcript = &word.answers["Explain"].follow_up_answers[0].conversation_messages;
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].content, "more?");
    }

    #[test]
    fn test_delete_file_refocuses_first_remaining() {
        let (session, _dir) = session();
        let (first, _) = session.add_word_to_file("a", "Day1").unwrap();
        let (second, _) = session.add_word_to_file("b", "Day2").unwrap();
        session.select_file(second).unwrap();

        session.delete_file(second).unwrap();
        let state = session.state();
        assert_eq!(state.current_file_id, Some(first));
        assert_eq!(state.words.len(), 1);
    }

    #[test]
    fn test_category_add_remove_and_reset() {
        let (session, _dir) = session();
        session.add_category("考试");
        session.add_category("考试");
        let state = session.state();
        assert_eq!(state.categories.iter().filter(|c| *c == "考试").count(), 1);

        session.delete_category("考试").unwrap();
        assert!(!session.state().categories.contains(&"考试".to_string()));

        session.reset();
        let state = session.state();
        assert_eq!(state.selected_category, "默认");
        assert!(state.words.is_empty());
    }

    #[test]
    fn test_search_word_not_found_is_typed() {
        let (session, _dir) = session();
        let (file_id, _) = session.add_word_to_file("hello", "Day1").unwrap();
        session.select_file(file_id).unwrap();
        assert!(matches!(
            session.search_word("missing"),
            Err(Error::NotFound(_))
        ));
    }
}
