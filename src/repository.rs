//! Repository - the only gateway between callers and the store
//!
//! Provides the knowledge-base operations:
//! - Listing, fetching and counting sections and questions
//! - Case-insensitive search and "recently added" feeds
//! - Validated add / update / delete, with cascade on section delete
//!
//! Every read goes through one TTL cache keyed by call signature; every
//! successful write invalidates it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TTL, TtlCache};
use crate::model::{KbStats, Question, QuestionHit, Section};
use crate::storage::SqliteStore;
use crate::{Error, Result};

/// Default size of the recent-sections feed
pub const DEFAULT_RECENT_SECTIONS: usize = 3;
/// Default size of the recent-questions feed
pub const DEFAULT_RECENT_QUESTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ReadKey {
    Sections,
    Section(i64),
    Questions(i64),
    Question(i64),
    Search(String),
    RecentSections(usize),
    RecentQuestions(usize),
    CountSections,
    CountQuestions,
    CountQuestionsIn(i64),
}

#[derive(Debug, Clone)]
enum Cached {
    Sections(Vec<Section>),
    Section(Option<Section>),
    Questions(Vec<Question>),
    Question(Option<Question>),
    Hits(Vec<QuestionHit>),
    Count(usize),
}

/// Knowledge-base repository over a [`SqliteStore`].
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct Repository {
    store: SqliteStore,
    cache: Arc<TtlCache<ReadKey, Cached>>,
}

impl Repository {
    /// Create a repository with the default five-minute cache
    pub fn new(store: SqliteStore) -> Self {
        Self::with_cache_ttl(store, DEFAULT_TTL)
    }

    /// A zero `ttl` turns caching off
    pub fn with_cache_ttl(store: SqliteStore, ttl: Duration) -> Self {
        Self::with_cache(store, ttl, DEFAULT_MAX_ENTRIES)
    }

    /// Cache at most `max_entries` read results for `ttl` each
    pub fn with_cache(store: SqliteStore, ttl: Duration, max_entries: u64) -> Self {
        Self {
            store,
            cache: Arc::new(TtlCache::with_capacity(ttl, max_entries)),
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    fn read_through<T: Clone>(
        &self,
        key: ReadKey,
        load: impl FnOnce(&SqliteStore) -> Result<T>,
        pack: fn(T) -> Cached,
        unpack: fn(Cached) -> Option<T>,
    ) -> Result<T> {
        if let Some(hit) = self.cache.get(&key).and_then(unpack) {
            trace!(?key, "cache hit");
            return Ok(hit);
        }

        debug!(?key, "loading from store");
        let generation = self.cache.generation();
        let value = load(&self.store)?;
        self.cache.insert_if_current(key, pack(value.clone()), generation);
        Ok(value)
    }

    fn invalidate(&self) {
        self.cache.invalidate();
    }

    // ========== Reads ==========

    /// All sections, ordered by title
    pub fn list_sections(&self) -> Result<Vec<Section>> {
        self.read_through(
            ReadKey::Sections,
            SqliteStore::list_sections,
            Cached::Sections,
            |c| match c {
                Cached::Sections(v) => Some(v),
                _ => None,
            },
        )
    }

    pub fn get_section(&self, id: i64) -> Result<Option<Section>> {
        self.read_through(
            ReadKey::Section(id),
            |store| store.get_section(id),
            Cached::Section,
            |c| match c {
                Cached::Section(v) => Some(v),
                _ => None,
            },
        )
    }

    /// Questions of a section in insertion order; empty for unknown sections
    pub fn list_questions(&self, section_id: i64) -> Result<Vec<Question>> {
        self.read_through(
            ReadKey::Questions(section_id),
            |store| store.list_questions(section_id),
            Cached::Questions,
            |c| match c {
                Cached::Questions(v) => Some(v),
                _ => None,
            },
        )
    }

    pub fn get_question(&self, id: i64) -> Result<Option<Question>> {
        self.read_through(
            ReadKey::Question(id),
            |store| store.get_question(id),
            Cached::Question,
            |c| match c {
                Cached::Question(v) => Some(v),
                _ => None,
            },
        )
    }

    /// Search question, answer and info. A blank query yields nothing.
    pub fn search(&self, query: &str) -> Result<Vec<QuestionHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        self.read_through(
            ReadKey::Search(query.to_lowercase()),
            |store| store.search(query),
            Cached::Hits,
            |c| match c {
                Cached::Hits(v) => Some(v),
                _ => None,
            },
        )
    }

    /// Newest sections first, at most `limit`
    pub fn recent_sections(&self, limit: usize) -> Result<Vec<Section>> {
        self.read_through(
            ReadKey::RecentSections(limit),
            |store| store.recent_sections(limit),
            Cached::Sections,
            |c| match c {
                Cached::Sections(v) => Some(v),
                _ => None,
            },
        )
    }

    /// Newest questions first with their section titles, at most `limit`
    pub fn recent_questions(&self, limit: usize) -> Result<Vec<QuestionHit>> {
        self.read_through(
            ReadKey::RecentQuestions(limit),
            |store| store.recent_questions(limit),
            Cached::Hits,
            |c| match c {
                Cached::Hits(v) => Some(v),
                _ => None,
            },
        )
    }

    pub fn count_sections(&self) -> Result<usize> {
        self.read_through(
            ReadKey::CountSections,
            SqliteStore::count_sections,
            Cached::Count,
            unpack_count,
        )
    }

    pub fn count_questions(&self) -> Result<usize> {
        self.read_through(
            ReadKey::CountQuestions,
            SqliteStore::count_questions,
            Cached::Count,
            unpack_count,
        )
    }

    pub fn count_questions_in(&self, section_id: i64) -> Result<usize> {
        self.read_through(
            ReadKey::CountQuestionsIn(section_id),
            |store| store.count_questions_in(section_id),
            Cached::Count,
            unpack_count,
        )
    }

    pub fn stats(&self) -> Result<KbStats> {
        Ok(KbStats {
            sections: self.count_sections()?,
            questions: self.count_questions()?,
        })
    }

    // ========== Writes ==========

    pub fn add_section(&self, title: &str, description: Option<&str>) -> Result<Section> {
        require("title", title)?;

        let section = self.store.insert_section(title, description)?;
        self.invalidate();
        info!(id = section.id, title = %section.title, "Section added");
        Ok(section)
    }

    pub fn add_question(
        &self,
        section_id: i64,
        question: &str,
        answer: Option<&str>,
        info: Option<&str>,
    ) -> Result<Question> {
        require("question", question)?;

        let added = self.store.insert_question(section_id, question, answer, info)?;
        self.invalidate();
        info!(id = added.id, section_id, "Question added");
        Ok(added)
    }

    pub fn update_section(&self, id: i64, title: &str, description: Option<&str>) -> Result<Section> {
        require("title", title)?;

        let section = self.store.update_section(id, title, description)?;
        self.invalidate();
        info!(id, "Section updated");
        Ok(section)
    }

    pub fn update_question(
        &self,
        id: i64,
        question: &str,
        answer: Option<&str>,
        info: Option<&str>,
    ) -> Result<Question> {
        require("question", question)?;

        let updated = self.store.update_question(id, question, answer, info)?;
        self.invalidate();
        info!(id, "Question updated");
        Ok(updated)
    }

    /// Delete a section together with its questions.
    ///
    /// Returns how many questions went with it.
    pub fn delete_section(&self, id: i64) -> Result<usize> {
        let removed = self.store.delete_section(id)?;
        self.invalidate();
        info!(id, questions = removed, "Section deleted");
        Ok(removed)
    }

    /// Delete a question; a missing id is a no-op
    pub fn delete_question(&self, id: i64) -> Result<()> {
        if self.store.delete_question(id)? {
            self.invalidate();
            info!(id, "Question deleted");
        } else {
            debug!(id, "Question already absent");
        }
        Ok(())
    }
}

fn unpack_count(cached: Cached) -> Option<usize> {
    match cached {
        Cached::Count(n) => Some(n),
        _ => None,
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn open_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("knowledge.db")).unwrap();
        (dir, Repository::new(store))
    }

    #[test]
    fn test_add_section_appears_with_fresh_id() {
        let (_dir, repo) = open_repo();
        let first = repo.add_section("Network", Some("LAN and Wi-Fi")).unwrap();
        let second = repo.add_section("Network", None).unwrap();

        assert_ne!(first.id, second.id);
        let listed = repo.list_sections().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|s| s.title == "Network"));
    }

    #[test]
    fn test_empty_title_rejected() {
        let (_dir, repo) = open_repo();
        let err = repo.add_section("   ", None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.is_recoverable());
        assert_eq!(repo.count_sections().unwrap(), 0);
    }

    #[test]
    fn test_add_question_validation_and_reference() {
        let (_dir, repo) = open_repo();
        let section = repo.add_section("Ops", None).unwrap();

        assert!(matches!(
            repo.add_question(section.id, "", Some("a"), None),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            repo.add_question(section.id + 100, "q", None, None),
            Err(Error::Reference(_))
        ));
    }

    #[test]
    fn test_update_unknown_is_not_found() {
        let (_dir, repo) = open_repo();
        assert!(matches!(
            repo.update_section(1, "t", None),
            Err(Error::NotFound { entity: "section", .. })
        ));
        assert!(matches!(
            repo.update_question(1, "q", None, None),
            Err(Error::NotFound { entity: "question", .. })
        ));
    }

    #[test]
    fn test_update_question_round_trip() {
        let (_dir, repo) = open_repo();
        let section = repo.add_section("Ops", None).unwrap();
        let original = repo.add_question(section.id, "Server down", Some("Restart"), None).unwrap();

        repo.update_question(original.id, "Server slow", Some("Check load"), Some("Call on-duty"))
            .unwrap();

        let listed = repo.list_questions(section.id).unwrap();
        assert_eq!(listed.len(), 1);
        let q = &listed[0];
        assert_eq!(q.id, original.id);
        assert_eq!(q.created_at, original.created_at);
        assert_eq!(q.question, "Server slow");
        assert_eq!(q.answer.as_deref(), Some("Check load"));
        assert_eq!(q.info.as_deref(), Some("Call on-duty"));
    }

    #[test]
    fn test_questions_in_insertion_order() {
        let (_dir, repo) = open_repo();
        let section = repo.add_section("Ops", None).unwrap();
        for text in ["c", "a", "b"] {
            repo.add_question(section.id, text, None, None).unwrap();
        }
        let texts: Vec<_> = repo
            .list_questions(section.id)
            .unwrap()
            .into_iter()
            .map(|q| q.question)
            .collect();
        assert_eq!(texts, vec!["c", "a", "b"]);
        assert!(repo.list_questions(section.id + 1).unwrap().is_empty());
    }

    #[test]
    fn test_search_contract() {
        let (_dir, repo) = open_repo();
        let web = repo.add_section("Web", None).unwrap();
        let db = repo.add_section("Database", None).unwrap();
        let nginx = repo.add_question(web.id, "Server down", Some("Restart nginx"), None).unwrap();
        repo.add_question(db.id, "Replica lag", None, Some("nginx is not involved")).unwrap();
        repo.add_question(db.id, "Backups", Some("Nightly"), None).unwrap();

        assert!(repo.search("").unwrap().is_empty());
        assert!(repo.search("   \t").unwrap().is_empty());
        assert!(repo.search("apache").unwrap().is_empty());

        let hits = repo.search("NGINX").unwrap();
        assert_eq!(hits.len(), 2);
        // ordered by section title: Database before Web
        assert_eq!(hits[0].section_title, "Database");
        assert_eq!(hits[1].question.id, nginx.id);
        assert_eq!(repo.search("nginx").unwrap(), hits);
    }

    #[test]
    fn test_cascade_completeness() {
        let (_dir, repo) = open_repo();
        let section = repo.add_section("Temp", None).unwrap();
        let ids: Vec<i64> = (0..3)
            .map(|i| repo.add_question(section.id, &format!("q{i}"), None, None).unwrap().id)
            .collect();
        // warm the cache so a stale read would show up
        assert_eq!(repo.list_questions(section.id).unwrap().len(), 3);

        assert_eq!(repo.delete_section(section.id).unwrap(), 3);

        assert!(repo.list_questions(section.id).unwrap().is_empty());
        for id in ids {
            assert!(repo.get_question(id).unwrap().is_none());
        }
        assert_eq!(repo.stats().unwrap(), KbStats { sections: 0, questions: 0 });
    }

    #[test]
    fn test_delete_question_is_idempotent() {
        let (_dir, repo) = open_repo();
        let section = repo.add_section("S", None).unwrap();
        let q = repo.add_question(section.id, "q", None, None).unwrap();

        repo.delete_question(q.id).unwrap();
        repo.delete_question(q.id).unwrap();
        assert_eq!(repo.count_questions_in(section.id).unwrap(), 0);
    }

    #[test]
    fn test_recent_feeds() {
        let (_dir, repo) = open_repo();
        let section = repo.add_section("S", None).unwrap();
        assert_eq!(repo.recent_questions(3).unwrap().len(), 0);

        let ids: Vec<i64> = (0..4)
            .map(|i| repo.add_question(section.id, &format!("q{i}"), None, None).unwrap().id)
            .collect();

        let recent = repo.recent_questions(3).unwrap();
        assert_eq!(recent.len(), 3);
        let recent_ids: Vec<i64> = recent.iter().map(|h| h.question.id).collect();
        assert_eq!(recent_ids, vec![ids[3], ids[2], ids[1]]);
        assert!(recent.iter().all(|h| h.section_title == "S"));
        for pair in recent.windows(2) {
            assert!(pair[0].question.created_at >= pair[1].question.created_at);
        }

        repo.add_section("T", None).unwrap();
        let sections = repo.recent_sections(5).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "T");
    }

    #[test]
    fn test_writes_invalidate_cached_reads() {
        let (_dir, repo) = open_repo();
        assert!(repo.list_sections().unwrap().is_empty());
        assert_eq!(repo.count_sections().unwrap(), 0);

        let section = repo.add_section("Fresh", None).unwrap();
        assert_eq!(repo.list_sections().unwrap().len(), 1);
        assert_eq!(repo.count_sections().unwrap(), 1);

        repo.update_section(section.id, "Renamed", None).unwrap();
        assert_eq!(repo.get_section(section.id).unwrap().unwrap().title, "Renamed");
    }

    #[test]
    fn test_cache_serves_within_ttl() {
        let (_dir, repo) = open_repo();
        repo.add_section("Cached", None).unwrap();
        assert_eq!(repo.list_sections().unwrap().len(), 1);

        // bypass the repository so no invalidation happens
        repo.store().insert_section("Behind the cache", None).unwrap();
        assert_eq!(repo.list_sections().unwrap().len(), 1);

        let uncached = Repository::with_cache_ttl(repo.store().clone(), Duration::ZERO);
        assert_eq!(uncached.list_sections().unwrap().len(), 2);
    }

    #[test]
    fn test_distinct_searches_stay_within_capacity() {
        let (_dir, repo) = open_repo();
        let repo = Repository::with_cache(repo.store().clone(), DEFAULT_TTL, 16);
        let section = repo.add_section("Ops", None).unwrap();
        repo.add_question(section.id, "needle in haystack", None, None).unwrap();

        for i in 0..200 {
            repo.search(&format!("needle{i}")).unwrap();
        }
        assert!(repo.cache.len() <= 16);
        assert_eq!(repo.search("NEEDLE").unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_adds_get_distinct_ids() {
        let (_dir, repo) = open_repo();
        let section_id = repo.add_section("Busy", None).unwrap().id;

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let repo = repo.clone();
                std::thread::spawn(move || {
                    (0..10)
                        .map(|i| {
                            repo.add_question(section_id, &format!("t{t}-q{i}"), None, None)
                                .unwrap()
                                .id
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id), "id {id} issued twice");
            }
        }
        assert_eq!(ids.len(), 80);
        assert_eq!(repo.count_questions_in(section_id).unwrap(), 80);
    }
}
