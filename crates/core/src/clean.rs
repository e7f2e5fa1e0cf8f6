//! Word cleaning and the shape-text validity predicate.
//!
//! Source decks mix single vocabulary words with caption and legend text.
//! The predicate rejects anything that cannot be a single word; the cleaner
//! strips every character outside the two accepted alphabets.

use regex::Regex;
use std::sync::LazyLock;

/// Template placeholder token that marks non-vocabulary shapes.
const RESERVED_MARKER: &str = "СУПЕРКРОКО";

/// Regex matching everything except Latin and Cyrillic letters.
///
/// Deliberately an explicit two-alphabet range rather than a general
/// Unicode letter class: the accepted character set is exactly
/// `A-Za-zА-Яа-яЁё`.
static NON_LETTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-zА-Яа-яЁё]+").unwrap());

/// Whether raw shape text qualifies as a single vocabulary word.
///
/// Rejects text containing a space, a hyphen, a colon, or the reserved
/// marker token (case-sensitive). This is a hard rejection filter, not a
/// transformation.
pub fn is_valid_shape_text(text: &str) -> bool {
    !(text.contains(' ')
        || text.contains('-')
        || text.contains(':')
        || text.contains(RESERVED_MARKER))
}

/// Strip everything except Latin and Cyrillic letters from a word.
///
/// Returns an empty string when nothing survives; callers discard those.
pub fn clean_word(word: &str) -> String {
    NON_LETTER_REGEX.replace_all(word, "").trim().to_string()
}
