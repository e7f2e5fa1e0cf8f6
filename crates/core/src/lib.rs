//! Core error taxonomy, word cleaning, and the spell-correction
//! normalization pipeline for vocabulary extraction.

pub mod clean;
pub mod error;
pub mod speller;

pub use clean::{clean_word, is_valid_shape_text};
pub use error::{Error, Result};
pub use speller::{normalize_words, SpellCorrector, YandexSpeller};
