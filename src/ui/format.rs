//! Display formatting for stored values

use chrono::Duration;

use crate::model::parse_store_timestamp;

/// Shift a stored UTC timestamp by `offset_hours` and render it as
/// `dd.mm.YYYY HH:MM`. Text that does not parse is returned unchanged.
pub fn format_timestamp(raw: &str, offset_hours: i32) -> String {
    match parse_store_timestamp(raw) {
        Some(utc) => (utc + Duration::hours(i64::from(offset_hours)))
            .format("%d.%m.%Y %H:%M")
            .to_string(),
        None => raw.to_string(),
    }
}

/// First `max_chars` characters of `text`, with `...` appended when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
