//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

/// Marker appended to truncated text
pub const ELLIPSIS: &str = "...";

/// Truncate text to at most `max_chars` characters, appending an ellipsis when shortened
///
/// A limit of 0 disables truncation.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if max_chars == 0 {
        return text.to_string();
    }

    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_text("very long text here", 10), "very long ...");
    }

    #[test]
    fn test_truncate_text_disabled() {
        assert_eq!(truncate_text("anything at all", 0), "anything at all");
    }

    #[test]
    fn test_truncate_text_counts_characters() {
        assert_eq!(truncate_text("Märzkonzert", 4), "März...");
        assert_eq!(truncate_text("日本語のテキスト", 3), "日本語...");
    }
}
