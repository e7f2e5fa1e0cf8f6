//! Error types shared across the vocabulary pipeline.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while extracting, normalizing, or storing words.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read an input file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// A referenced entity (archive, account, word) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The uploaded archive is not a readable ZIP container.
    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    /// Input that cannot be processed: unsupported file type, malformed
    /// deck XML, or a word that is empty after cleaning.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A uniqueness rule was violated (duplicate account, duplicate word).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The spell-correction service failed. Not locally recoverable;
    /// surfaced to the caller as-is.
    #[error("Spell service error: {0}")]
    SpellService(String),

    /// The acting account lacks the required privileges.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(String),
}
