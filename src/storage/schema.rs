//! Database schema definitions
//!
//! Column names and types match existing `knowledge.db` files, so stores
//! written by earlier deployments open unchanged.

/// SQL to create the sections table
pub const CREATE_SECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create the questions table
/// `section_id` integrity is checked by the store before insert
pub const CREATE_QUESTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    section_id INTEGER,
    question TEXT NOT NULL,
    answer TEXT,
    info TEXT,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (section_id) REFERENCES sections (id)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_questions_section_id ON questions(section_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_SECTIONS_TABLE, CREATE_QUESTIONS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
