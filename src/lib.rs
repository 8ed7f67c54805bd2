//! # Knowbase - staff knowledge base
//!
//! A two-table knowledge base: named sections, each holding questions
//! (situation / answer / notes). Knowbase provides:
//! - SQLite-backed storage with scoped connections per operation
//! - A repository layer with validation and a TTL read-through cache
//! - Case-insensitive substring search and "recently added" feeds
//! - An admin gate, a serializable view state machine, a CLI and a JSON HTTP API

pub mod model;
pub mod storage;
pub mod cache;
pub mod repository;
pub mod auth;
pub mod view;
pub mod config;
pub mod server;
pub mod ui;


// Re-exports for convenient access
pub use model::{KbStats, Question, QuestionHit, Section};
pub use storage::SqliteStore;
pub use repository::Repository;
pub use auth::{CredentialCheck, DenyAll, Sha256Credential};
pub use view::{Action, Session, View};

/// Result type alias for Knowbase operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Knowbase operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required field was empty
    #[error("Validation error: {0}")]
    Validation(String),

    /// A question referenced a section that does not exist
    #[error("Section {0} does not exist")]
    Reference(i64),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Validation and reference errors can be fixed by the caller re-submitting
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Reference(_))
    }
}
