//! SQLite-backed document store for word-list files.
//!
//! A file's word list is persisted as one JSON column; every word-level
//! mutation is a read-modify-write of the whole row. There is no
//! per-record versioning: concurrent writers to the same file race and
//! the last write wins.

use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::schema::SCHEMA_SQL;
use crate::types::{Answer, Answers, FileSummary, RenderingFormat, SavedFile, Word};
use tutor_core::{Error, Result};

/// Words returned per page by [`WordStore::load_words_by_page`].
pub const PAGE_SIZE: usize = 10;

/// Store for word-list files.
pub struct WordStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl WordStore {
    /// Open or create the store. `db_dir` is the directory; the file will
    /// be `db_dir/tutor.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("tutor.db");

        let conn = create_connection(&db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };

        let file_count = store.count_files()?;
        info!(
            "WordStore initialized: {} files, path={}",
            file_count,
            store.db_path.display()
        );
        Ok(store)
    }

    /// Path of the backing database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // ---------------------------------------------------------------
    // File CRUD
    // ---------------------------------------------------------------

    /// Insert a new file. Returns the generated file ID.
    pub fn add_file(&self, name: &str, category: &str, words: &[Word]) -> Result<i64> {
        let words_json = serde_json::to_string(words)?;
        let now = Utc::now().timestamp_millis();

        let conn = self.conn.lock();
        let id = conn
            .prepare_cached(
                "INSERT INTO files (name, category, words_json, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(db_err)?
            .insert(params![name, category, words_json, now])
            .map_err(db_err)?;
        Ok(id)
    }

    /// Replace a file's word list in full.
    pub fn update_file_words(&self, file_id: i64, words: &[Word]) -> Result<()> {
        let words_json = serde_json::to_string(words)?;
        let now = Utc::now().timestamp_millis();

        let conn = self.conn.lock();
        let count = conn
            .prepare_cached("UPDATE files SET words_json = ?1, updated_at = ?2 WHERE id = ?3")
            .map_err(db_err)?
            .execute(params![words_json, now, file_id])
            .map_err(db_err)?;
        if count == 0 {
            return Err(Error::NotFound(format!("file {file_id}")));
        }
        Ok(())
    }

    /// Rename a file.
    pub fn rename_file(&self, file_id: i64, name: &str) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let conn = self.conn.lock();
        let count = conn
            .prepare_cached("UPDATE files SET name = ?1, updated_at = ?2 WHERE id = ?3")
            .map_err(db_err)?
            .execute(params![name, now, file_id])
            .map_err(db_err)?;
        if count == 0 {
            return Err(Error::NotFound(format!("file {file_id}")));
        }
        Ok(())
    }

    /// Delete a file and its words. Returns whether a row was removed.
    pub fn delete_file(&self, file_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let count = conn
            .execute("DELETE FROM files WHERE id = ?1", params![file_id])
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Fetch a file with its full word list. `NotFound` if the ID is absent.
    pub fn fetch_file_details_by_id(&self, file_id: i64) -> Result<SavedFile> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached("SELECT id, name, category, words_json FROM files WHERE id = ?1")
            .map_err(db_err)?
            .query_row(params![file_id], row_to_file)
            .optional()
            .map_err(db_err)?;
        row.ok_or_else(|| Error::NotFound(format!("file {file_id}")))?
    }

    /// All files, words included.
    pub fn fetch_all_files(&self) -> Result<Vec<SavedFile>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT id, name, category, words_json FROM files ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], row_to_file)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        rows.into_iter().collect()
    }

    /// File listing without the word payload.
    pub fn fetch_files_without_words(&self) -> Result<Vec<FileSummary>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT id, name, category FROM files ORDER BY id")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FileSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: row.get(2)?,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Files in one category, words included.
    pub fn fetch_files_by_category(&self, category: &str) -> Result<Vec<SavedFile>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, name, category, words_json FROM files WHERE category = ?1 ORDER BY id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![category], row_to_file)
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        rows.into_iter().collect()
    }

    /// Distinct category names, in insertion order of their first file.
    pub fn list_categories(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT category FROM files GROUP BY category ORDER BY MIN(id)")
            .map_err(db_err)?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    /// Find a file by category and name, words included.
    pub fn find_file_by_name(&self, category: &str, name: &str) -> Result<Option<SavedFile>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached(
                "SELECT id, name, category, words_json FROM files WHERE category = ?1 AND name = ?2",
            )
            .map_err(db_err)?
            .query_row(params![category, name], row_to_file)
            .optional()
            .map_err(db_err)?;
        row.transpose()
    }

    pub fn count_files(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn
            .prepare_cached("SELECT COUNT(*) FROM files")
            .map_err(db_err)?
            .query_row([], |row| row.get(0))
            .map_err(db_err);
        count
    }

    /// Word count across all files.
    pub fn total_word_count(&self) -> Result<usize> {
        Ok(self
            .fetch_all_files()?
            .iter()
            .map(|f| f.words.len())
            .sum())
    }

    /// Word count of a file by ID.
    pub fn file_length_by_id(&self, file_id: i64) -> Result<usize> {
        Ok(self.fetch_file_details_by_id(file_id)?.words.len())
    }

    /// Word count of a file by category and name; 0 if the file is absent.
    pub fn file_length_by_name(&self, category: &str, name: &str) -> Result<usize> {
        Ok(self
            .find_file_by_name(category, name)?
            .map(|f| f.words.len())
            .unwrap_or(0))
    }

    // ---------------------------------------------------------------
    // Word operations
    // ---------------------------------------------------------------

    /// One page of a file's words, 1-based. A page past the end is empty,
    /// not an error.
    pub fn load_words_by_page(&self, file_id: i64, page: usize) -> Result<Vec<Word>> {
        let file = self.fetch_file_details_by_id(file_id)?;
        // An offset that overflows usize is past the end by definition.
        let start = match page.saturating_sub(1).checked_mul(PAGE_SIZE) {
            Some(start) => start,
            None => return Ok(Vec::new()),
        };
        if start >= file.words.len() {
            return Ok(Vec::new());
        }
        let end = (start + PAGE_SIZE).min(file.words.len());
        Ok(file.words[start..end].to_vec())
    }

    /// All words of a file.
    pub fn load_words_by_file_id(&self, file_id: i64) -> Result<Vec<Word>> {
        Ok(self.fetch_file_details_by_id(file_id)?.words)
    }

    /// Append a word, assigning the next stable idx (`max(idx) + 1`).
    /// Returns the assigned idx.
    pub fn append_word(&self, file_id: i64, word: Word) -> Result<i64> {
        let mut file = self.fetch_file_details_by_id(file_id)?;
        let idx = next_word_idx(&file.words);
        let mut word = word;
        word.idx = idx;
        file.words.push(word);
        self.update_file_words(file_id, &file.words)?;
        Ok(idx)
    }

    /// Replace the word with the given idx. Returns the updated word list.
    pub fn update_word_in_file(&self, file_id: i64, idx: i64, updated: Word) -> Result<Vec<Word>> {
        let mut file = self.fetch_file_details_by_id(file_id)?;
        let slot = file
            .words
            .iter_mut()
            .find(|w| w.idx == idx)
            .ok_or_else(|| Error::NotFound(format!("word {idx} in file {file_id}")))?;
        *slot = updated;
        self.update_file_words(file_id, &file.words)?;
        Ok(file.words)
    }

    /// Remove the word with the given idx. Remaining idx values keep
    /// their gaps.
    pub fn delete_word_from_file(&self, file_id: i64, idx: i64) -> Result<()> {
        let mut file = self.fetch_file_details_by_id(file_id)?;
        let before = file.words.len();
        file.words.retain(|w| w.idx != idx);
        if file.words.len() == before {
            return Err(Error::NotFound(format!("word {idx} in file {file_id}")));
        }
        self.update_file_words(file_id, &file.words)
    }

    // ---------------------------------------------------------------
    // Translation (per-action answer) operations
    // ---------------------------------------------------------------

    /// Set the answer for one action on one word, overwriting any previous
    /// answer under the same action name. If the idx is absent, a new word
    /// is created with `text = word_text` at the next free idx. Returns
    /// the idx of the affected word.
    #[allow(clippy::too_many_arguments)]
    pub fn add_or_update_translation_in_word(
        &self,
        file_id: i64,
        word_idx: i64,
        action_name: &str,
        word_text: &str,
        text: &str,
        format: RenderingFormat,
        message_id: Option<String>,
        conversation_id: Option<String>,
    ) -> Result<i64> {
        let mut file = self.fetch_file_details_by_id(file_id)?;
        let answer = Answer {
            text: text.to_string(),
            format,
            message_id,
            conversation_id,
            ..Answer::default()
        };

        let idx = match file.words.iter_mut().find(|w| w.idx == word_idx) {
            Some(word) => {
                word.answers.insert(action_name.to_string(), answer);
                word.idx
            }
            None => {
                let idx = next_word_idx(&file.words);
                let mut word = Word::new(idx, word_text);
                word.is_new = true;
                word.answers.insert(action_name.to_string(), answer);
                file.words.push(word);
                idx
            }
        };

        self.update_file_words(file_id, &file.words)?;
        Ok(idx)
    }

    /// Remove one action's answer from a word. A missing answer is a no-op.
    pub fn delete_translation_from_word(
        &self,
        file_id: i64,
        word_idx: i64,
        action_name: &str,
    ) -> Result<()> {
        let mut file = self.fetch_file_details_by_id(file_id)?;
        let word = file
            .words
            .iter_mut()
            .find(|w| w.idx == word_idx)
            .ok_or_else(|| Error::NotFound(format!("word {word_idx} in file {file_id}")))?;
        if word.answers.remove(action_name).is_some() {
            self.update_file_words(file_id, &file.words)?;
        }
        Ok(())
    }

    /// All per-action answers of one word.
    pub fn translations_by_word_idx(&self, file_id: i64, word_idx: i64) -> Result<Answers> {
        let file = self.fetch_file_details_by_id(file_id)?;
        let word = file
            .words
            .iter()
            .find(|w| w.idx == word_idx)
            .ok_or_else(|| Error::NotFound(format!("word {word_idx} in file {file_id}")))?;
        Ok(word.answers.clone())
    }

    /// Words of one file that are due for review now.
    pub fn words_to_review_by_file_id(&self, file_id: i64) -> Result<Vec<Word>> {
        let words = self.load_words_by_file_id(file_id)?;
        Ok(crate::review::words_due_for_review(&words, Utc::now()))
    }
}

fn create_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path).map_err(db_err)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(db_err)?;
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| Error::Database(format!("Schema init failed: {e}")))?;
    Ok(conn)
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

fn next_word_idx(words: &[Word]) -> i64 {
    words.iter().map(|w| w.idx).max().unwrap_or(0) + 1
}

fn row_to_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<SavedFile>> {
    let id: i64 = row.get(0)?;
    let name: String = row.get(1)?;
    let category: String = row.get(2)?;
    let words_json: String = row.get(3)?;
    Ok(serde_json::from_str(&words_json)
        .map(|words| SavedFile {
            id,
            name,
            category,
            words,
        })
        .map_err(Error::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (WordStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = WordStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_file_crud() {
        let (store, _dir) = test_store();

        let id = store.add_file("Day1", "默认", &[Word::new(1, "hello")]).unwrap();
        let file = store.fetch_file_details_by_id(id).unwrap();
        assert_eq!(file.name, "Day1");
        assert_eq!(file.category, "默认");
        assert_eq!(file.words.len(), 1);

        store.rename_file(id, "Day1-renamed").unwrap();
        assert_eq!(store.fetch_file_details_by_id(id).unwrap().name, "Day1-renamed");

        assert!(store.delete_file(id).unwrap());
        assert!(!store.delete_file(id).unwrap());
        assert!(matches!(
            store.fetch_file_details_by_id(id),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_fetch_by_category_and_summaries() {
        let (store, _dir) = test_store();
        store.add_file("a", "单词", &[]).unwrap();
        store.add_file("b", "表达", &[]).unwrap();
        store.add_file("c", "单词", &[]).unwrap();

        let words_cat = store.fetch_files_by_category("单词").unwrap();
        assert_eq!(words_cat.len(), 2);

        let summaries = store.fetch_files_without_words().unwrap();
        assert_eq!(summaries.len(), 3);

        let categories = store.list_categories().unwrap();
        assert_eq!(categories, vec!["单词".to_string(), "表达".to_string()]);
    }

    #[test]
    fn test_paging_fixed_size_and_empty_past_end() {
        let (store, _dir) = test_store();
        let words: Vec<Word> = (1..=23).map(|i| Word::new(i, format!("w{i}"))).collect();
        let id = store.add_file("big", "默认", &words).unwrap();

        assert_eq!(store.load_words_by_page(id, 1).unwrap().len(), 10);
        assert_eq!(store.load_words_by_page(id, 2).unwrap().len(), 10);
        let page3 = store.load_words_by_page(id, 3).unwrap();
        assert_eq!(page3.len(), 3);
        assert_eq!(page3[0].idx, 21);
        assert!(store.load_words_by_page(id, 4).unwrap().is_empty());
        assert!(store.load_words_by_page(id, 99).unwrap().is_empty());
        // Offsets too large to compute are past the end as well
        assert!(store.load_words_by_page(id, usize::MAX).unwrap().is_empty());
        assert!(store
            .load_words_by_page(id, usize::MAX / PAGE_SIZE + 2)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_append_word_assigns_stable_gapped_idx() {
        let (store, _dir) = test_store();
        let id = store.add_file("Day1", "默认", &[]).unwrap();

        let idx1 = store.append_word(id, Word::new(0, "hello")).unwrap();
        let idx2 = store.append_word(id, Word::new(0, "world")).unwrap();
        assert_eq!(idx1, 1);
        assert_eq!(idx2, 2);

        // max+1: deleting the tail word frees its idx for the next append
        store.delete_word_from_file(id, 2).unwrap();
        let idx3 = store.append_word(id, Word::new(0, "again")).unwrap();
        assert_eq!(idx3, 2);

        // ... but a gap from a middle deletion is never filled
        store.append_word(id, Word::new(0, "tail")).unwrap();
        store.delete_word_from_file(id, 2).unwrap();
        let idx4 = store.append_word(id, Word::new(0, "after-gap")).unwrap();
        assert_eq!(idx4, 4);

        let words = store.load_words_by_file_id(id).unwrap();
        let mut idxs: Vec<i64> = words.iter().map(|w| w.idx).collect();
        idxs.sort_unstable();
        idxs.dedup();
        assert_eq!(idxs.len(), words.len());
    }

    #[test]
    fn test_update_word_by_idx_not_position() {
        let (store, _dir) = test_store();
        let id = store
            .add_file("f", "默认", &[Word::new(3, "a"), Word::new(7, "b")])
            .unwrap();

        let mut updated = Word::new(7, "b-updated");
        updated.review_count = 2;
        let words = store.update_word_in_file(id, 7, updated).unwrap();
        assert_eq!(words[1].text, "b-updated");

        assert!(matches!(
            store.update_word_in_file(id, 99, Word::new(99, "x")),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.delete_word_from_file(id, 99),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_translation_overwrite_is_idempotent() {
        let (store, _dir) = test_store();
        let id = store.add_file("f", "默认", &[Word::new(1, "hello")]).unwrap();

        for _ in 0..2 {
            store
                .add_or_update_translation_in_word(
                    id,
                    1,
                    "Translate",
                    "hello",
                    "你好",
                    RenderingFormat::Markdown,
                    None,
                    None,
                )
                .unwrap();
        }

        let answers = store.translations_by_word_idx(id, 1).unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers["Translate"].text, "你好");
    }

    #[test]
    fn test_translation_creates_missing_word() {
        let (store, _dir) = test_store();
        let id = store.add_file("f", "默认", &[Word::new(4, "seed")]).unwrap();

        let idx = store
            .add_or_update_translation_in_word(
                id,
                42,
                "Translate",
                "fresh",
                "T",
                RenderingFormat::Text,
                Some("m1".into()),
                None,
            )
            .unwrap();
        assert_eq!(idx, 5);

        let words = store.load_words_by_file_id(id).unwrap();
        let created = words.iter().find(|w| w.idx == 5).unwrap();
        assert_eq!(created.text, "fresh");
        assert!(created.is_new);
        assert_eq!(created.answers["Translate"].message_id.as_deref(), Some("m1"));
    }

    #[test]
    fn test_delete_translation() {
        let (store, _dir) = test_store();
        let id = store.add_file("f", "默认", &[Word::new(1, "hello")]).unwrap();
        store
            .add_or_update_translation_in_word(
                id, 1, "Translate", "hello", "你好",
                RenderingFormat::Markdown, None, None,
            )
            .unwrap();

        store.delete_translation_from_word(id, 1, "Translate").unwrap();
        assert!(store.translations_by_word_idx(id, 1).unwrap().is_empty());

        // Absent answer is a no-op, absent word is NotFound
        store.delete_translation_from_word(id, 1, "Translate").unwrap();
        assert!(matches!(
            store.delete_translation_from_word(id, 9, "Translate"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_words_to_review() {
        let (store, _dir) = test_store();
        let mut due = Word::new(1, "due");
        due.next_review = Some(Utc::now() - chrono::Duration::days(1));
        let mut future = Word::new(2, "future");
        future.next_review = Some(Utc::now() + chrono::Duration::days(1));
        let unscheduled = Word::new(3, "none");

        let id = store.add_file("r", "学习", &[due, future, unscheduled]).unwrap();
        let words = store.words_to_review_by_file_id(id).unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].idx, 1);
    }

    #[test]
    fn test_file_length_by_name_missing_is_zero() {
        let (store, _dir) = test_store();
        assert_eq!(store.file_length_by_name("History", "2024/01/01").unwrap(), 0);

        store
            .add_file("2024/01/01", "History", &[Word::new(1, "a")])
            .unwrap();
        assert_eq!(store.file_length_by_name("History", "2024/01/01").unwrap(), 1);
    }

    #[test]
    fn test_total_word_count_spans_files() {
        let (store, _dir) = test_store();
        assert_eq!(store.total_word_count().unwrap(), 0);

        store.add_file("a", "默认", &[Word::new(1, "x")]).unwrap();
        store
            .add_file("b", "学习", &[Word::new(1, "y"), Word::new(2, "z")])
            .unwrap();
        assert_eq!(store.total_word_count().unwrap(), 3);
    }
}
