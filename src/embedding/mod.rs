//! Query embedding for semantic retrieval.
//!
//! The index is built offline; at query time only the question is embedded,
//! with the same model the index was built with.

mod cached;
mod hashing;
mod openai;

pub use cached::CachedEmbedder;
pub use hashing::HashEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{EmbeddingProvider, EmbeddingSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Build the configured embedder once at startup.
pub fn create_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let dimensions = settings.dimensions as usize;

    match settings.provider {
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new(dimensions))),
        EmbeddingProvider::OpenAI => {
            let api_key = crate::openai::api_key_from_env(&settings.api_key_env)?;
            let client = crate::openai::create_client(
                &settings.api_base,
                &api_key,
                Duration::from_secs(crate::openai::DEFAULT_TIMEOUT_SECS),
            )?;
            let embedder = OpenAIEmbedder::with_client(client, &settings.model, dimensions)
                .with_request_dimensions(settings.send_dimensions);

            if settings.cache {
                Ok(Arc::new(CachedEmbedder::new(embedder)))
            } else {
                Ok(Arc::new(embedder))
            }
        }
    }
}
