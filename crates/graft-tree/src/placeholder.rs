//! Recognition of `(( ... ))` placeholder text

use regex::Regex;
use std::sync::LazyLock;

/// Matches a whole scalar of the form `(( body ))`, tolerating whitespace
/// around and inside the delimiters.
pub static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*\(\(\s*(.*?)\s*\)\)\s*$").unwrap());

/// The text between the `((` and `))` delimiters, trimmed, or `None` if
/// `text` is an ordinary string.
///
/// ```
/// use graft_tree::placeholder_body;
///
/// assert_eq!(placeholder_body("((  grab meta.name ))"), Some("grab meta.name"));
/// assert_eq!(placeholder_body("plain text"), None);
/// ```
pub fn placeholder_body(text: &str) -> Option<&str> {
    PLACEHOLDER_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
