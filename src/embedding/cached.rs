//! Memoizing wrapper for remote embedders.

use super::Embedder;
use crate::error::{RapportError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Remembers every query vector for the process lifetime, so the same text
/// always maps to the same vector even when the backing service is not
/// bit-for-bit reproducible.
pub struct CachedEmbedder<E> {
    inner: E,
    cache: Mutex<HashMap<String, Vec<f32>>>,
}

impl<E: Embedder> CachedEmbedder<E> {
    /// Wrap an embedder.
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of memoized texts.
    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn lookup(&self, text: &str) -> Result<Option<Vec<f32>>> {
        let cache = self.cache.lock().map_err(|e| {
            RapportError::Embedding(format!("Failed to acquire lock: {}", e))
        })?;
        Ok(cache.get(text).cloned())
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CachedEmbedder<E> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(hit) = self.lookup(text)? {
            debug!("Query embedding served from cache");
            return Ok(hit);
        }

        // Lock is not held across the await; a racing caller for the same
        // text keeps whichever vector landed first.
        let embedding = self.inner.embed(text).await?;

        let mut cache = self.cache.lock().map_err(|e| {
            RapportError::Embedding(format!("Failed to acquire lock: {}", e))
        })?;
        Ok(cache
            .entry(text.to_string())
            .or_insert(embedding)
            .clone())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }
}
