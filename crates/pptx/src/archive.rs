//! Zip archive walker: locates deck entries and aggregates their words.

use croco_core::{Error, Result};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::parser::DeckParser;

/// Extension (case-insensitive) that marks a deck entry.
const DECK_EXTENSION: &str = "pptx";

/// Extract candidate words from every deck inside a zip archive.
///
/// Directory entries and entries without the deck extension are silently
/// skipped; results from the remaining decks are concatenated in archive
/// order. A malformed container fails with [`Error::InvalidArchive`].
pub fn extract_words_from_archive<R: Read + Seek>(reader: R) -> Result<Vec<String>> {
    let mut archive =
        ZipArchive::new(reader).map_err(|e| Error::InvalidArchive(e.to_string()))?;

    let parser = DeckParser::new();
    let mut words = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::InvalidArchive(e.to_string()))?;

        if entry.is_dir() || !is_deck_entry(entry.name()) {
            continue;
        }

        log::info!("reading deck entry '{}'", entry.name());

        // Decks are themselves zip containers, so the entry has to be
        // buffered to get a seekable stream.
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| Error::InvalidArchive(e.to_string()))?;

        words.extend(parser.extract_words(Cursor::new(bytes))?);
    }

    Ok(words)
}

/// Whether an archive entry name carries the deck extension.
fn is_deck_entry(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(DECK_EXTENSION))
        .unwrap_or(false)
}
