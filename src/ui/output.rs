use crate::model::{QuestionHit, Section};
use crate::ui::{Icons, format_timestamp, preview, theme};
use owo_colors::OwoColorize;

const EMPTY_PANE: &str = "—";

pub fn header(text: &str) {
    println!("{} {}", Icons::BOOKS, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// One section with optional question count and creation date
pub fn section_line(section: &Section, questions: Option<usize>, utc_offset_hours: i32) {
    println!(
        "{} {} {}",
        Icons::FOLDER,
        section.title.style(theme().header.clone()),
        muted(&format!("#{}", section.id))
    );
    if let Some(description) = section.description.as_deref().filter(|d| !d.is_empty()) {
        println!("   {}", dim(description));
    }
    if let Some(count) = questions {
        summary_row("   Questions:", &count.to_string());
    }
    if !section.created_at.is_empty() {
        summary_row(
            &format!("   {} Added:", Icons::CALENDAR),
            &format_timestamp(&section.created_at, utc_offset_hours),
        );
    }
}

pub fn question_pane(text: &str) {
    println!("  {} {}", Icons::QUESTION, text.style(theme().question.clone()));
}

pub fn answer_pane(text: Option<&str>) {
    let text = text.filter(|t| !t.is_empty()).unwrap_or(EMPTY_PANE);
    println!("  {} {}", Icons::ANSWER, text.style(theme().answer.clone()));
}

pub fn info_pane(text: Option<&str>) {
    let text = text.filter(|t| !t.is_empty()).unwrap_or(EMPTY_PANE);
    println!("  {} {}", Icons::NOTE, text.style(theme().note.clone()));
}

/// `📁 Section » question preview (date)` for search results and the feed
pub fn hit_line(hit: &QuestionHit, utc_offset_hours: i32) {
    let date = if hit.question.created_at.is_empty() {
        String::new()
    } else {
        format!(" ({})", format_timestamp(&hit.question.created_at, utc_offset_hours))
    };
    println!(
        "{} {} {} {}{} {}",
        Icons::FOLDER,
        hit.section_title.style(theme().header.clone()),
        Icons::ARROW,
        preview(&hit.question.question, 60),
        muted(&date),
        muted(&format!("#{}", hit.question.id))
    );
}
