//! Text normalization applied to every extracted document.

use std::sync::OnceLock;

use regex::Regex;

fn control_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F-\x9F]").expect("valid control-char regex")
    })
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

fn excess_newlines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid newline-run regex"))
}

/// Clean extracted text.
///
/// Strips control characters, collapses every run of whitespace (newlines
/// included) to a single space, caps newline runs at two, and trims the
/// result.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = control_chars().replace_all(text, "");
    let text = whitespace_runs().replace_all(&text, " ");
    let text = excess_newlines().replace_all(&text, "\n\n");

    text.trim().to_string()
}

/// Length in characters, the unit every chunk size is measured in.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}
