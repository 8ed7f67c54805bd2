use tabled::{Table, Tabled, settings::Style};

use crate::model::{KbStats, Section};
use crate::ui::{format_timestamp, preview};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct SectionRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Questions")]
    questions: usize,
    #[tabled(rename = "Added")]
    added: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &KbStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Sections", &stats.sections.to_string());
    builder.add_row("Questions", &stats.questions.to_string());
    builder.build()
}

/// Sections paired with their question counts
pub fn sections_table(sections: &[(Section, usize)], utc_offset_hours: i32) -> String {
    let rows: Vec<SectionRow> = sections
        .iter()
        .map(|(section, questions)| SectionRow {
            id: section.id,
            title: section.title.clone(),
            description: preview(section.description.as_deref().unwrap_or(""), 40),
            questions: *questions,
            added: format_timestamp(&section.created_at, utc_offset_hours),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}
