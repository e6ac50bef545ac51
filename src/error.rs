//! Error types for Rapport.

use thiserror::Error;

/// Library-level error type for Rapport operations.
#[derive(Error, Debug)]
pub enum RapportError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index artifact not found: {0}")]
    IndexNotFound(String),

    #[error("Corrupt artifact: {0}")]
    CorruptArtifact(String),

    #[error("Index and passage artifacts do not match: {0}")]
    ArtifactMismatch(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    VectorIndex(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RapportError {
    /// Whether this error means the process must not serve queries.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RapportError::Config(_)
                | RapportError::IndexNotFound(_)
                | RapportError::CorruptArtifact(_)
                | RapportError::ArtifactMismatch(_)
                | RapportError::TomlParse(_)
        )
    }
}

/// Result type alias for Rapport operations.
pub type Result<T> = std::result::Result<T, RapportError>;
