//! Upload processing: deck/archive extraction through the normalization
//! pipeline into the store.

use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::Path;

use croco_core::{normalize_words, Error, Result, SpellCorrector};
use croco_pptx::{extract_words_from_archive, DeckParser};
use croco_store::Store;
use serde::Serialize;

/// One uploaded file, fully buffered.
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Counts reported back after an upload.
#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub filenames: String,
    pub extracted: usize,
    pub unique_extracted: usize,
    pub checked_unique: usize,
    pub inserted: usize,
}

/// Candidate words from one upload: decks are parsed directly, zip
/// archives are walked. Anything else is unsupported.
fn extract_from_upload(file: &UploadedFile) -> Result<Vec<String>> {
    let extension = Path::new(&file.name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase());

    match extension.as_deref() {
        Some("pptx") => DeckParser::new().extract_words(Cursor::new(&file.bytes)),
        Some("zip") => extract_words_from_archive(Cursor::new(&file.bytes)),
        _ => Err(Error::InvalidInput(
            "only .pptx or .zip is supported".to_string(),
        )),
    }
}

/// Run the full insertion pipeline over a batch of uploads.
///
/// Blocking: parses zip containers and makes one spell-service round-trip.
pub fn process_uploads<S: SpellCorrector + ?Sized>(
    store: &Store,
    speller: &S,
    files: &[UploadedFile],
) -> Result<UploadReport> {
    let mut extracted = Vec::new();
    let mut filenames = Vec::new();

    for file in files {
        filenames.push(file.name.clone());
        extracted.extend(extract_from_upload(file)?);
    }

    let unique: BTreeSet<String> = extracted
        .iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect();

    let checked = normalize_words(&unique, speller)?;
    let inserted = if checked.is_empty() {
        0
    } else {
        store.insert_new_words(&checked)?
    };

    Ok(UploadReport {
        filenames: filenames.join(", "),
        extracted: extracted.len(),
        unique_extracted: unique.len(),
        checked_unique: checked.len(),
        inserted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoSpeller;

    impl SpellCorrector for EchoSpeller {
        fn correct_text(&self, text: &str) -> croco_core::Result<String> {
            Ok(text.to_string())
        }
    }

    #[test]
    fn test_unsupported_extension_is_invalid_input() {
        let store = Store::open_in_memory().unwrap();
        let files = vec![UploadedFile {
            name: "notes.txt".to_string(),
            bytes: b"hello".to_vec(),
        }];
        let err = process_uploads(&store, &EchoSpeller, &files).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_empty_upload_list_short_circuits() {
        let store = Store::open_in_memory().unwrap();
        let report = process_uploads(&store, &EchoSpeller, &[]).unwrap();
        assert_eq!(report.extracted, 0);
        assert_eq!(report.inserted, 0);
        assert_eq!(store.count_words().unwrap(), 0);
    }
}
