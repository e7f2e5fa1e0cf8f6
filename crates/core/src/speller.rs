//! Spell-correction client and the candidate normalization pipeline.
//!
//! Candidates are batched into a single whitespace-joined request instead of
//! one call per word; the upstream service is rate-limited. The service may
//! return tokens with attached punctuation, so every token is cleaned again
//! after correction.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::clean::clean_word;
use crate::error::{Error, Result};

/// Default endpoint of the Yandex spell-correction service.
const SPELLER_ENDPOINT: &str =
    "https://speller.yandex.net/services/spellservice.json/checkText";

/// Languages the service is asked to check against.
const SPELLER_LANGS: &str = "ru,en";

/// Token-level spell correction over a whitespace-separated batch.
pub trait SpellCorrector {
    /// Correct the given text in one round-trip, returning the corrected
    /// text. A failure aborts the whole operation; there is no retry.
    fn correct_text(&self, text: &str) -> Result<String>;
}

/// One correction reported by the spell service.
#[derive(Debug, Deserialize)]
struct SpellFix {
    /// Character offset of the misspelled word in the submitted text.
    pos: usize,
    /// Length of the misspelled word in characters.
    len: usize,
    /// Suggested replacements, best first. May be empty.
    #[serde(default)]
    s: Vec<String>,
}

/// Client for the Yandex spell-correction HTTP service.
///
/// The call is a blocking round-trip with no configured timeout; async
/// callers must run it on a blocking thread.
pub struct YandexSpeller {
    endpoint: String,
    client: OnceLock<reqwest::blocking::Client>,
}

impl YandexSpeller {
    pub fn new() -> Self {
        Self {
            endpoint: SPELLER_ENDPOINT.to_string(),
            client: OnceLock::new(),
        }
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: OnceLock::new(),
        }
    }

    fn client(&self) -> &reqwest::blocking::Client {
        self.client.get_or_init(reqwest::blocking::Client::new)
    }
}

impl Default for YandexSpeller {
    fn default() -> Self {
        Self::new()
    }
}

impl SpellCorrector for YandexSpeller {
    fn correct_text(&self, text: &str) -> Result<String> {
        log::info!("checking spelling of {} chars", text.chars().count());

        let response = self
            .client()
            .get(&self.endpoint)
            .query(&[("text", text), ("lang", SPELLER_LANGS)])
            .send()
            .map_err(|e| Error::SpellService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::SpellService(format!(
                "service returned status {}",
                response.status()
            )));
        }

        let fixes: Vec<SpellFix> = response
            .json()
            .map_err(|e| Error::SpellService(format!("bad response body: {}", e)))?;

        Ok(apply_fixes(text, fixes))
    }
}

/// Apply corrections to the submitted text, best suggestion first.
///
/// Offsets are character-based, so replacements are spliced back to front to
/// keep earlier offsets valid.
fn apply_fixes(text: &str, mut fixes: Vec<SpellFix>) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    fixes.sort_by(|a, b| b.pos.cmp(&a.pos));

    for fix in fixes {
        let Some(suggestion) = fix.s.first() else {
            continue;
        };
        if fix.pos + fix.len > chars.len() {
            log::warn!(
                "ignoring out-of-range correction at {}..{}",
                fix.pos,
                fix.pos + fix.len
            );
            continue;
        }
        chars.splice(fix.pos..fix.pos + fix.len, suggestion.chars());
    }

    chars.into_iter().collect()
}

/// Run the full normalization pipeline over candidate words.
///
/// Candidates are cleaned, de-duplicated, and sorted; an empty set
/// short-circuits without contacting the speller. Otherwise the batch is
/// submitted once, the corrected response is split on whitespace, and each
/// token is cleaned again, dropping empties and duplicates.
pub fn normalize_words<I, S>(candidates: I, speller: &S) -> Result<Vec<String>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    S: SpellCorrector + ?Sized,
{
    let unique: BTreeSet<String> = candidates
        .into_iter()
        .map(|w| clean_word(w.as_ref()))
        .filter(|w| !w.is_empty())
        .collect();

    if unique.is_empty() {
        return Ok(Vec::new());
    }

    let batch = unique.into_iter().collect::<Vec<_>>().join(" ");
    let corrected = speller.correct_text(&batch)?;

    let checked: BTreeSet<String> = corrected
        .split_whitespace()
        .map(clean_word)
        .filter(|w| !w.is_empty())
        .collect();

    Ok(checked.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Stub corrector that records the batch it received.
    struct EchoSpeller {
        called_with: RefCell<Option<String>>,
    }

    impl EchoSpeller {
        fn new() -> Self {
            Self {
                called_with: RefCell::new(None),
            }
        }
    }

    impl SpellCorrector for EchoSpeller {
        fn correct_text(&self, text: &str) -> Result<String> {
            *self.called_with.borrow_mut() = Some(text.to_string());
            Ok(text.to_string())
        }
    }

    /// Stub corrector that must never be contacted.
    struct PanicSpeller;

    impl SpellCorrector for PanicSpeller {
        fn correct_text(&self, _text: &str) -> Result<String> {
            panic!("speller must not be called for an empty candidate set");
        }
    }

    #[test]
    fn test_empty_input_short_circuits() {
        let words: Vec<String> = Vec::new();
        let result = normalize_words(words, &PanicSpeller).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_all_candidates_cleaned_away_short_circuits() {
        let result = normalize_words(["123", "!?"], &PanicSpeller).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_clean_tokens_round_trip() {
        let speller = EchoSpeller::new();
        let result = normalize_words(["one", "two"], &speller).unwrap();

        assert_eq!(speller.called_with.borrow().as_deref(), Some("one two"));
        assert_eq!(result, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_candidates_deduplicated_before_batching() {
        let speller = EchoSpeller::new();
        let result = normalize_words(["pear", "pear!", "apple"], &speller).unwrap();

        assert_eq!(speller.called_with.borrow().as_deref(), Some("apple pear"));
        assert_eq!(result, vec!["apple".to_string(), "pear".to_string()]);
    }

    /// The service sometimes returns tokens with attached punctuation;
    /// post-hoc cleaning strips it.
    struct NoisySpeller;

    impl SpellCorrector for NoisySpeller {
        fn correct_text(&self, _text: &str) -> Result<String> {
            Ok("banana, cherry. cherry".to_string())
        }
    }

    #[test]
    fn test_service_output_cleaned_and_deduplicated() {
        let result = normalize_words(["banan", "chery"], &NoisySpeller).unwrap();
        assert_eq!(result, vec!["banana".to_string(), "cherry".to_string()]);
    }

    #[test]
    fn test_apply_fixes_replaces_back_to_front() {
        let fixes = vec![
            SpellFix {
                pos: 0,
                len: 5,
                s: vec!["banana".to_string()],
            },
            SpellFix {
                pos: 6,
                len: 5,
                s: vec!["cherry".to_string()],
            },
        ];
        assert_eq!(apply_fixes("banan chery", fixes), "banana cherry");
    }

    #[test]
    fn test_apply_fixes_char_offsets() {
        // Offsets are characters, not bytes; Cyrillic chars are multi-byte.
        let fixes = vec![SpellFix {
            pos: 0,
            len: 6,
            s: vec!["яблоко".to_string()],
        }];
        assert_eq!(apply_fixes("яблако", fixes), "яблоко");
    }

    #[test]
    fn test_apply_fixes_skips_empty_suggestions() {
        let fixes = vec![SpellFix {
            pos: 0,
            len: 5,
            s: Vec::new(),
        }];
        assert_eq!(apply_fixes("banan", fixes), "banan");
    }
}
