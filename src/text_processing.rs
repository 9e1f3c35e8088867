//! # Text Processing Module
//!
//! ## Purpose
//! Deterministic text normalization applied identically to every corpus
//! document and every query before embedding, so both live in the same vector
//! space. A normalization mismatch between the two call sites silently
//! degrades every similarity score, which is why this module exposes a single
//! shared `normalize` function and nothing duplicates it.
//!
//! ## Input/Output Specification
//! - **Input**: Raw legal ruling text or query text
//! - **Output**: Normalized lowercase text restricted to a legal-text-safe
//!   character set
//! - **Contract**: Pure and total; empty input yields empty output

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Normalize text for embedding. Steps, in order: NFC unicode normalization,
/// collapse whitespace runs to a single space, strip characters outside the
/// legal-text allow-list (word characters, whitespace and `. , : ( ) – -`),
/// trim and lowercase, drop one trailing semicolon if present.
pub fn normalize(text: &str) -> String {
    let text: String = text.nfc().collect();

    let collapsed = Regex::new(r"\s+").unwrap().replace_all(&text, " ");

    let stripped = Regex::new(r"[^\w\s.,:()–-]")
        .unwrap()
        .replace_all(&collapsed, "");

    let mut normalized = stripped.trim().to_lowercase();
    if normalized.ends_with(';') {
        normalized.pop();
    }

    normalized
}

/// Bounded-length prefix of a text, used when a sampled case has no
/// extractable outcome to serve as query text. Appends an ellipsis when the
/// text was truncated. Char-boundary safe.
pub fn bounded_prefix(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(max_chars).collect();
        format!("{}...", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t  "), "");
    }

    #[test]
    fn test_whitespace_runs_collapse_to_single_space() {
        assert_eq!(
            normalize("theft  of\n\na   firearm"),
            "theft of a firearm"
        );
    }

    #[test]
    fn test_disallowed_characters_are_stripped() {
        assert_eq!(
            normalize("Verdict: guilty! (Art. 1 §2) [sic]"),
            "verdict: guilty (art. 1 2) sic"
        );
    }

    #[test]
    fn test_legal_punctuation_survives() {
        assert_eq!(
            normalize("Art. 351, para (1) – penal code"),
            "art. 351, para (1) – penal code"
        );
    }

    #[test]
    fn test_lowercased_and_trimmed() {
        assert_eq!(normalize("  ILLEGAL Possession  "), "illegal possession");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("Theft of a FIREARM, art. 363;");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_bounded_prefix_truncates_with_ellipsis() {
        assert_eq!(bounded_prefix("abcdef", 10), "abcdef");
        assert_eq!(bounded_prefix("abcdef", 3), "abc...");
    }

    #[test]
    fn test_bounded_prefix_respects_char_boundaries() {
        let text = "négligence grave";
        assert_eq!(bounded_prefix(text, 4), "négl...");
    }
}
