use crate::core::ClosureStatus;
use chrono::{Datelike, NaiveDate};

/// Splits a PascalCase name into lower-case words: `PartlyClosed` -> "partly closed".
pub fn status_phrase(status: ClosureStatus) -> String {
    split_words(status.name()).to_lowercase()
}

/// As [`status_phrase`] but with the first letter capitalised: "Partly closed".
pub fn status_sentence(status: ClosureStatus) -> String {
    let phrase = status_phrase(status);
    let mut chars = phrase.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => phrase,
    }
}

fn split_words(name: &str) -> String {
    let mut words = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() && i > 0 {
            words.push(' ');
        }
        words.push(ch);
    }
    words
}

/// British-style range: "10 January 2024", "10 to 12 January 2024",
/// "30 January to 2 February 2024" or both dates in full.
pub fn date_range_text(start: NaiveDate, end: NaiveDate) -> String {
    if start == end {
        return start.format("%-d %B %Y").to_string();
    }
    if end < start || start.year() != end.year() {
        return format!(
            "{} to {}",
            start.format("%-d %B %Y"),
            end.format("%-d %B %Y")
        );
    }
    if start.month() == end.month() {
        format!("{} to {}", start.format("%-d"), end.format("%-d %B %Y"))
    } else {
        format!("{} to {}", start.format("%-d %B"), end.format("%-d %B %Y"))
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Notes ready for an HTML body. Blank lines become `<br />`; no notes renders "None".
pub fn notes_html(notes: Option<&str>) -> String {
    match notes.filter(|n| !n.is_empty()) {
        Some(notes) => escape_html(&notes.replace("\r\n", "\n")).replace("\n\n", "<br />"),
        None => "None".to_string(),
    }
}
