//! Error types for Docent

use thiserror::Error;

/// Main error type for Docent operations
#[derive(Error, Debug)]
pub enum DocentError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upload store errors (file system)
    #[error("File error: {0}")]
    File(String),

    /// Text extraction errors
    #[error("Extraction error: {0}")]
    Extract(String),

    /// The uploaded format has no extractor
    #[error("Unsupported file format: {0}")]
    Unsupported(String),

    /// Embedding generation errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index errors (LanceDB)
    #[error("Index error: {0}")]
    Index(String),

    /// Upstream generation provider errors
    #[error("Generation error: {0}")]
    Generation(String),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for Docent operations
pub type Result<T> = std::result::Result<T, DocentError>;
