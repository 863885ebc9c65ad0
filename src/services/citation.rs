//! Verbatim citation check.
//!
//! A citation is accepted when, after lowercasing, dropping punctuation and
//! collapsing whitespace, it appears inside the evaluated text normalised the
//! same way. Empty citations are always accepted.

use crate::domain::models::Evidence;

/// Lowercase alphanumerics separated by single spaces.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else if ch.is_whitespace() {
            pending_space = true;
        }
    }
    out
}

/// True when `citation` occurs in `source_text` ignoring case and punctuation.
pub fn is_verbatim(citation: &str, source_text: &str) -> bool {
    let needle = normalize(citation);
    needle.is_empty() || normalize(source_text).contains(&needle)
}

/// Drops every item whose citation is not a verbatim excerpt of `source_text`.
pub fn retain_verbatim(items: Vec<Evidence>, source_text: &str) -> Vec<Evidence> {
    let haystack = normalize(source_text);
    items
        .into_iter()
        .filter(|item| {
            let needle = normalize(&item.citation);
            let keep = needle.is_empty() || haystack.contains(&needle);
            if !keep {
                tracing::debug!(citation = %item.citation, "dropping non-verbatim citation");
            }
            keep
        })
        .collect()
}
