//! PPTX (Office Open XML) shape-text extraction for vocabulary sourcing.
//!
//! A .pptx file is a ZIP archive of XML documents. This crate walks slides
//! in presentation order, pulls the text of every shape that carries a text
//! body, and filters it through the single-word validity predicate. It also
//! walks outer zip archives that bundle several decks.

pub mod archive;
pub mod parser;

pub use archive::extract_words_from_archive;
pub use parser::DeckParser;
