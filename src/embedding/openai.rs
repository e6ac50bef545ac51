//! OpenAI-compatible embeddings implementation.

use super::Embedder;
use crate::error::{RapportError, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Embedder backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
    request_dimensions: bool,
}

impl OpenAIEmbedder {
    /// Create an embedder over an already configured client.
    pub fn with_client(client: Client<OpenAIConfig>, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
            request_dimensions: false,
        }
    }

    /// Ask the service for `dimensions`-sized vectors explicitly.
    pub fn with_request_dimensions(mut self, enabled: bool) -> Self {
        self.request_dimensions = enabled;
        self
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut args = CreateEmbeddingRequestArgs::default();
        args.model(&self.model)
            .input(EmbeddingInput::String(text.to_string()));
        if self.request_dimensions {
            args.dimensions(self.dimensions as u32);
        }
        let request = args
            .build()
            .map_err(|e| RapportError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| RapportError::OpenAI(format!("Embedding API error: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .min_by_key(|e| e.index)
            .map(|e| e.embedding)
            .ok_or_else(|| RapportError::Embedding("Empty embedding response".to_string()))?;

        if embedding.len() != self.dimensions {
            return Err(RapportError::Embedding(format!(
                "Model {} returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                self.dimensions
            )));
        }

        debug!("Embedded query ({} dimensions)", embedding.len());
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_embedder_creation() {
        let client =
            crate::openai::create_client("http://localhost:1/v1", "test", Duration::from_secs(1))
                .unwrap();

        let embedder = OpenAIEmbedder::with_client(client.clone(), "mistral-embed", 1024);
        assert_eq!(embedder.dimensions(), 1024);
        assert!(!embedder.request_dimensions);

        let embedder = OpenAIEmbedder::with_client(client, "text-embedding-3-large", 3072)
            .with_request_dimensions(true);
        assert_eq!(embedder.dimensions(), 3072);
        assert!(embedder.request_dimensions);
    }
}
