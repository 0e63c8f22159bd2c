//! Utility functions and helpers.

pub mod http;

/// Collapse whitespace runs into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an integer that may contain `,` digit grouping (e.g. "12,345").
pub fn parse_grouped_int(s: &str) -> Option<u64> {
    let digits: String = s.trim().chars().filter(|c| *c != ',').collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Fill the `{id}` placeholder of a URL template.
pub fn fill_template(template: &str, id: &str) -> String {
    template.replace("{id}", id)
}

/// Truncate a string to at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
