//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite file with tables:
//! - sections(id, title, description, created_at)
//! - questions(id, section_id, question, answer, info, created_at)

pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteStore, DEFAULT_BUSY_TIMEOUT};
