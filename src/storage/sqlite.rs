//! SQLite storage implementation
//!
//! Every operation opens its own connection and drops it before returning,
//! so nothing is held across calls. Writers that need more than one
//! statement use an IMMEDIATE transaction: the write lock is taken up front
//! and a caller that cannot get it within the busy timeout fails with a
//! storage error instead of interleaving with another writer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};

use super::schema;
use crate::model::{Question, QuestionHit, Section};
use crate::{Error, Result};

/// How long a connection waits on the store's write lock by default
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SECTION_COLUMNS: &str = "id, title, description, created_at";
const QUESTION_COLUMNS: &str = "id, section_id, question, answer, info, created_at";

/// SQLite-backed storage for sections and questions
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Open a database file (creates it and its parent directory if missing)
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { path, busy_timeout };
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure both tables exist. Never drops or truncates existing data.
    pub fn initialize(&self) -> Result<()> {
        let conn = self.connect()?;
        // journal_mode returns the resulting mode as a row. WAL is persistent:
        // opening an older file once converts it, and sqlite3 >= 3.7 still reads it.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        tracing::debug!("Schema ready at {:?}", self.path);
        Ok(())
    }

    /// Open a scoped connection with the busy timeout and `fold_case` installed
    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.create_scalar_function(
            "fold_case",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let text: Option<String> = ctx.get(0)?;
                Ok(text.map(|t| t.to_lowercase()))
            },
        )?;
        Ok(conn)
    }

    // ========== Section Operations ==========

    /// All sections ordered by title
    pub fn list_sections(&self) -> Result<Vec<Section>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SECTION_COLUMNS} FROM sections ORDER BY title, id"
        ))?;

        let sections = stmt
            .query_map([], row_to_section)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sections)
    }

    /// Get a section by ID
    pub fn get_section(&self, id: i64) -> Result<Option<Section>> {
        let conn = self.connect()?;
        query_section(&conn, id)
    }

    /// Newest sections first
    pub fn recent_sections(&self, limit: usize) -> Result<Vec<Section>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SECTION_COLUMNS} FROM sections ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))?;

        let sections = stmt
            .query_map([limit as i64], row_to_section)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sections)
    }

    pub fn insert_section(&self, title: &str, description: Option<&str>) -> Result<Section> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO sections (title, description) VALUES (?1, ?2)",
            params![title, description],
        )?;
        let id = conn.last_insert_rowid();

        query_section(&conn, id)?.ok_or(Error::NotFound { entity: "section", id })
    }

    /// Replace title and description; `id` and `created_at` are untouched
    pub fn update_section(&self, id: i64, title: &str, description: Option<&str>) -> Result<Section> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE sections SET title = ?1, description = ?2 WHERE id = ?3",
            params![title, description, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound { entity: "section", id });
        }

        let section = query_section(&tx, id)?.ok_or(Error::NotFound { entity: "section", id })?;
        tx.commit()?;
        Ok(section)
    }

    /// Delete a section and all of its questions as one unit.
    ///
    /// Returns the number of questions removed with it.
    pub fn delete_section(&self, id: i64) -> Result<usize> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let removed = tx.execute("DELETE FROM questions WHERE section_id = ?1", [id])?;
        let deleted = tx.execute("DELETE FROM sections WHERE id = ?1", [id])?;
        if deleted == 0 {
            // dropping the transaction rolls it back
            return Err(Error::NotFound { entity: "section", id });
        }

        tx.commit()?;
        Ok(removed)
    }

    /// Count all sections
    pub fn count_sections(&self) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sections", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // ========== Question Operations ==========

    /// Questions of one section in insertion order
    pub fn list_questions(&self, section_id: i64) -> Result<Vec<Question>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE section_id = ?1 ORDER BY id"
        ))?;

        let questions = stmt
            .query_map([section_id], row_to_question)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(questions)
    }

    pub fn get_question(&self, id: i64) -> Result<Option<Question>> {
        let conn = self.connect()?;
        query_question(&conn, id)
    }

    /// Case-insensitive substring search over question, answer and info.
    ///
    /// The needle is matched literally (no LIKE wildcards) after Unicode
    /// lowercasing on both sides. Results are ordered by section title, then id.
    pub fn search(&self, needle: &str) -> Result<Vec<QuestionHit>> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT q.id, q.section_id, q.question, q.answer, q.info, q.created_at, s.title
             FROM questions q
             JOIN sections s ON q.section_id = s.id
             WHERE instr(fold_case(q.question), ?1) > 0
                OR instr(fold_case(q.answer), ?1) > 0
                OR instr(fold_case(q.info), ?1) > 0
             ORDER BY s.title, q.id",
        )?;

        let hits = stmt
            .query_map([&needle], row_to_hit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(hits)
    }

    /// Newest questions first, with their section titles
    pub fn recent_questions(&self, limit: usize) -> Result<Vec<QuestionHit>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT q.id, q.section_id, q.question, q.answer, q.info, q.created_at, s.title
             FROM questions q
             JOIN sections s ON q.section_id = s.id
             ORDER BY q.created_at DESC, q.id DESC
             LIMIT ?1",
        )?;

        let hits = stmt
            .query_map([limit as i64], row_to_hit)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(hits)
    }

    /// Insert a question under an existing section.
    ///
    /// The existence check and the insert share one transaction, so a
    /// concurrent section delete cannot leave an orphan behind.
    pub fn insert_question(
        &self,
        section_id: i64,
        question: &str,
        answer: Option<&str>,
        info: Option<&str>,
    ) -> Result<Question> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM sections WHERE id = ?1)",
            [section_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::Reference(section_id));
        }

        tx.execute(
            "INSERT INTO questions (section_id, question, answer, info) VALUES (?1, ?2, ?3, ?4)",
            params![section_id, question, answer, info],
        )?;
        let id = tx.last_insert_rowid();

        let inserted = query_question(&tx, id)?.ok_or(Error::NotFound { entity: "question", id })?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Replace question, answer and info; `section_id`, `id` and `created_at` stay
    pub fn update_question(
        &self,
        id: i64,
        question: &str,
        answer: Option<&str>,
        info: Option<&str>,
    ) -> Result<Question> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx.execute(
            "UPDATE questions SET question = ?1, answer = ?2, info = ?3 WHERE id = ?4",
            params![question, answer, info, id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound { entity: "question", id });
        }

        let updated = query_question(&tx, id)?.ok_or(Error::NotFound { entity: "question", id })?;
        tx.commit()?;
        Ok(updated)
    }

    /// Delete a question. Returns false if it was already gone.
    pub fn delete_question(&self, id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let deleted = conn.execute("DELETE FROM questions WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    /// Count all questions
    pub fn count_questions(&self) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Count the questions of one section
    pub fn count_questions_in(&self, section_id: i64) -> Result<usize> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM questions WHERE section_id = ?1",
            [section_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn query_section(conn: &Connection, id: i64) -> Result<Option<Section>> {
    conn.query_row(
        &format!("SELECT {SECTION_COLUMNS} FROM sections WHERE id = ?1"),
        [id],
        row_to_section,
    )
    .optional()
    .map_err(Into::into)
}

fn query_question(conn: &Connection, id: i64) -> Result<Option<Question>> {
    conn.query_row(
        &format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1"),
        [id],
        row_to_question,
    )
    .optional()
    .map_err(Into::into)
}

/// Helper to convert a row to a Section
fn row_to_section(row: &rusqlite::Row) -> rusqlite::Result<Section> {
    Ok(Section {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    })
}

/// Helper to convert a row to a Question
fn row_to_question(row: &rusqlite::Row) -> rusqlite::Result<Question> {
    Ok(Question {
        id: row.get(0)?,
        section_id: row.get(1)?,
        question: row.get(2)?,
        answer: row.get(3)?,
        info: row.get(4)?,
        created_at: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
    })
}

/// Question columns followed by the joined section title
fn row_to_hit(row: &rusqlite::Row) -> rusqlite::Result<QuestionHit> {
    Ok(QuestionHit {
        question: row_to_question(row)?,
        section_title: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("knowledge.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (dir, store) = open_store();
        store.insert_section("Network", None).unwrap();

        store.initialize().unwrap();
        let reopened = SqliteStore::open(dir.path().join("knowledge.db")).unwrap();

        assert_eq!(reopened.count_sections().unwrap(), 1);
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("kb").join("knowledge.db");
        SqliteStore::open(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_fails_while_another_writer_holds_the_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("knowledge.db");
        let store = SqliteStore::open_with_timeout(&path, Duration::from_millis(50)).unwrap();

        let blocker = Connection::open(&path).unwrap();
        blocker.execute_batch("BEGIN IMMEDIATE").unwrap();

        let result = store.insert_section("Blocked", None);
        assert!(matches!(result, Err(Error::Storage(_))));

        blocker.execute_batch("ROLLBACK").unwrap();
        assert_eq!(store.count_sections().unwrap(), 0);
    }

    #[test]
    fn test_section_crud() {
        let (_dir, store) = open_store();

        let section = store.insert_section("Printers", Some("Office printers")).unwrap();
        assert!(section.id > 0);
        assert!(crate::model::parse_store_timestamp(&section.created_at).is_some());

        let updated = store.update_section(section.id, "Printing", None).unwrap();
        assert_eq!(updated.id, section.id);
        assert_eq!(updated.title, "Printing");
        assert_eq!(updated.description, None);
        assert_eq!(updated.created_at, section.created_at);

        let fetched = store.get_section(section.id).unwrap().unwrap();
        assert_eq!(fetched, updated);
    }

    #[test]
    fn test_sections_sorted_by_title() {
        let (_dir, store) = open_store();
        store.insert_section("Zebra", None).unwrap();
        store.insert_section("Alpha", None).unwrap();
        store.insert_section("Mango", None).unwrap();

        let titles: Vec<_> = store.list_sections().unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["Alpha", "Mango", "Zebra"]);
    }

    #[test]
    fn test_insert_question_unknown_section() {
        let (_dir, store) = open_store();
        let err = store.insert_question(42, "Lost", None, None).unwrap_err();
        assert!(matches!(err, Error::Reference(42)));
        assert_eq!(store.count_questions().unwrap(), 0);
    }

    #[test]
    fn test_delete_section_cascades() {
        let (_dir, store) = open_store();
        let doomed = store.insert_section("Doomed", None).unwrap();
        let kept = store.insert_section("Kept", None).unwrap();
        let q1 = store.insert_question(doomed.id, "one", None, None).unwrap();
        let q2 = store.insert_question(doomed.id, "two", None, None).unwrap();
        store.insert_question(kept.id, "three", None, None).unwrap();

        let removed = store.delete_section(doomed.id).unwrap();

        assert_eq!(removed, 2);
        assert!(store.get_section(doomed.id).unwrap().is_none());
        assert!(store.get_question(q1.id).unwrap().is_none());
        assert!(store.get_question(q2.id).unwrap().is_none());
        assert!(store.list_questions(doomed.id).unwrap().is_empty());
        assert_eq!(store.count_questions().unwrap(), 1);
    }

    #[test]
    fn test_delete_unknown_section_is_not_found() {
        let (_dir, store) = open_store();
        let err = store.delete_section(9).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "section", id: 9 }));
    }

    #[test]
    fn test_delete_question_idempotent() {
        let (_dir, store) = open_store();
        let section = store.insert_section("S", None).unwrap();
        let q = store.insert_question(section.id, "q", None, None).unwrap();

        assert!(store.delete_question(q.id).unwrap());
        assert!(!store.delete_question(q.id).unwrap());
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let (_dir, store) = open_store();
        let first = store.insert_section("First", None).unwrap();
        store.delete_section(first.id).unwrap();
        let second = store.insert_section("Second", None).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_search_matches_literally() {
        let (_dir, store) = open_store();
        let section = store.insert_section("Billing", None).unwrap();
        store.insert_question(section.id, "Discount of 50% applied twice", None, None).unwrap();
        store.insert_question(section.id, "Discount of 50 roubles", None, None).unwrap();

        let hits = store.search("50%").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].question.question, "Discount of 50% applied twice");
        assert_eq!(hits[0].section_title, "Billing");
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let (_dir, store) = open_store();
        let section = store.insert_section("Касса", None).unwrap();
        store
            .insert_question(section.id, "Не печатает чек", Some("Перезапустить ПРИНТЕР"), None)
            .unwrap();

        assert_eq!(store.search("принтер").unwrap().len(), 1);
        assert_eq!(store.search("НЕ ПЕЧАТАЕТ").unwrap().len(), 1);
    }

    #[test]
    fn test_recent_questions_limit_and_order() {
        let (_dir, store) = open_store();
        let section = store.insert_section("S", None).unwrap();
        let ids: Vec<i64> = (0..5)
            .map(|i| store.insert_question(section.id, &format!("q{i}"), None, None).unwrap().id)
            .collect();

        let recent = store.recent_questions(3).unwrap();
        let recent_ids: Vec<i64> = recent.iter().map(|h| h.question.id).collect();
        assert_eq!(recent_ids, vec![ids[4], ids[3], ids[2]]);
        assert!(store.recent_questions(0).unwrap().is_empty());
    }
}
