//! Domain records
//!
//! Timestamps are kept exactly as the store writes them: naive UTC text
//! (`YYYY-MM-DD HH:MM:SS`). Shifting and formatting for display happens in
//! [`crate::ui`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Format used by SQLite's `CURRENT_TIMESTAMP`
pub const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A named grouping of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Store-generated identifier, never reused
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Naive UTC insert time, immutable
    pub created_at: String,
}

/// A situation / answer / notes entry belonging to exactly one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub section_id: i64,
    /// The situation or prompt
    pub question: String,
    /// The procedure to follow
    pub answer: Option<String>,
    /// Supplementary notes
    pub info: Option<String>,
    pub created_at: String,
}

/// A question together with the title of the section that owns it.
///
/// Returned by search and by the recent-questions feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionHit {
    #[serde(flatten)]
    pub question: Question,
    pub section_title: String,
}

/// Parse a timestamp written by the store
pub fn parse_store_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, STORE_TIMESTAMP_FORMAT).ok()
}

/// Exact row counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KbStats {
    pub sections: usize,
    pub questions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_store_timestamp() {
        let parsed = parse_store_timestamp("2024-03-05 21:15:09").unwrap();
        assert_eq!(parsed.format("%d.%m.%Y %H:%M").to_string(), "05.03.2024 21:15");
        assert!(parse_store_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_hit_serializes_flat() {
        let hit = QuestionHit {
            question: Question {
                id: 7,
                section_id: 2,
                question: "Server down".into(),
                answer: Some("Restart nginx".into()),
                info: None,
                created_at: "2024-01-01 00:00:00".into(),
            },
            section_title: "Ops".into(),
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["section_title"], "Ops");
        assert!(json["info"].is_null());
    }
}
