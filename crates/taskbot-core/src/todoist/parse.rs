//! Due-hint extraction from free-text task input

use std::sync::LazyLock;

use regex::Regex;

use super::types::DueHint;

/// Matches the "tomorrow" keyword as a whole word, in English or Spanish
static TOMORROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:tomorrow|mañana)\b").expect("tomorrow pattern is valid")
});

/// Task text split into content and due hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTask {
    pub content: String,
    pub due_hint: DueHint,
}

/// Extract the due hint from raw task text.
///
/// When the keyword is present every occurrence is removed and the remaining
/// words are re-joined with single spaces. Otherwise the text is kept as is
/// and the task is due today.
pub fn parse_task_input(raw: &str) -> ParsedTask {
    if !TOMORROW.is_match(raw) {
        return ParsedTask {
            content: raw.to_string(),
            due_hint: DueHint::Today,
        };
    }

    let stripped = TOMORROW.replace_all(raw, " ");
    ParsedTask {
        content: stripped.split_whitespace().collect::<Vec<_>>().join(" "),
        due_hint: DueHint::Tomorrow,
    }
}
