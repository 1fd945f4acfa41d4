/// Text canonicalization for rule matching
///
/// Every keyword and regex in the pipeline matches against the output of
/// `normalize_text`, so changes here change every score.
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// URL-shaped tokens, replaced by a space before matching
    static ref URL_TOKEN: Regex = Regex::new(r"(?i)\b(?:https?://|www\.)\S+").unwrap();
    /// Runs of non-word characters, collapsed to a single space
    static ref NON_WORD_RUN: Regex = Regex::new(r"\W+").unwrap();
}

/// Canonicalize free text for matching: lowercase, URLs stripped, non-word
/// runs collapsed to single spaces, trimmed. Deterministic and side-effect
/// free; empty input yields an empty string.
pub fn normalize_text(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = URL_TOKEN.replace_all(&lowered, " ");
    let collapsed = NON_WORD_RUN.replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

/// Whether the raw (un-normalized) text carries a link marker.
///
/// Must run against the raw text: normalization removes URLs, so this check
/// could never fire afterwards.
pub fn has_link_marker(raw: &str) -> bool {
    let lowered = raw.to_lowercase();
    lowered.contains("http://") || lowered.contains("https://") || lowered.contains("www.")
}
