//! Pre-flight checks before starting a session.
//!
//! Validates that the API keys a command needs are present before loading
//! artifacts, so a missing key is reported up front instead of mid-conversation.

use crate::config::{EmbeddingProvider, Settings};
use crate::error::Result;
use crate::openai::api_key_from_env;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering questions needs the generation key and, for remote
    /// embeddings, the embedding key.
    Ask,
    /// Retrieval only needs the embedding key when embeddings are remote.
    Search,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    if let Operation::Ask = operation {
        check_api_key(&settings.generation.api_key_env)?;
    }
    if settings.embedding.provider == EmbeddingProvider::OpenAI {
        check_api_key(&settings.embedding.api_key_env)?;
    }
    Ok(())
}

/// Check that an API key environment variable is set and non-empty.
fn check_api_key(var: &str) -> Result<()> {
    api_key_from_env(var).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_with_hash_embedder_needs_nothing() {
        let settings = Settings::default();
        assert_eq!(settings.embedding.provider, EmbeddingProvider::Hash);
        assert!(check(Operation::Search, &settings).is_ok());
    }

    #[test]
    fn test_ask_requires_generation_key() {
        let mut settings = Settings::default();
        settings.generation.api_key_env = "RAPPORT_PREFLIGHT_UNSET_3b1e".to_string();

        let err = check(Operation::Ask, &settings).unwrap_err();
        assert!(err.to_string().contains("RAPPORT_PREFLIGHT_UNSET_3b1e"));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        std::env::set_var("RAPPORT_PREFLIGHT_EMPTY_c40d", "  ");
        let mut settings = Settings::default();
        settings.generation.api_key_env = "RAPPORT_PREFLIGHT_EMPTY_c40d".to_string();

        let err = check(Operation::Ask, &settings).unwrap_err();
        assert!(err.to_string().contains("is empty"));
    }

    #[test]
    fn test_openai_embeddings_require_embedding_key() {
        std::env::set_var("RAPPORT_PREFLIGHT_GEN_58aa", "sk-gen");
        let mut settings = Settings::default();
        settings.generation.api_key_env = "RAPPORT_PREFLIGHT_GEN_58aa".to_string();
        settings.embedding.provider = EmbeddingProvider::OpenAI;
        settings.embedding.api_key_env = "RAPPORT_PREFLIGHT_EMB_unset_91".to_string();

        assert!(check(Operation::Ask, &settings).is_err());
        assert!(check(Operation::Search, &settings).is_err());
    }
}
