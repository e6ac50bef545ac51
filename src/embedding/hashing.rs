//! Local feature-hashing embedder.
//!
//! Each lower-cased alphanumeric token is hashed with SHA-256 into a signed
//! bucket; the accumulated vector is L2-normalized. Output depends only on the
//! text, so it is identical across calls and across processes.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Deterministic bag-of-words embedder with no model or network dependency.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Create a hashing embedder producing `dimensions`-sized vectors.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed synchronously.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        vector
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_index::cosine_similarity;

    #[tokio::test]
    async fn test_embedding_is_deterministic() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed("Quelle est la durée du préavis ?").await.unwrap();
        let b = embedder.embed("Quelle est la durée du préavis ?").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other = HashEmbedder::new(64);
        assert_eq!(other.embed_text("Quelle est la durée du préavis ?"), a);
    }

    #[test]
    fn test_embedding_is_normalized() {
        let embedder = HashEmbedder::new(32);
        let v = embedder.embed_text("the quick brown fox");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(8);
        assert!(embedder.embed_text("  ?! ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let embedder = HashEmbedder::new(128);
        assert_eq!(
            embedder.embed_text("Contract, termination!"),
            embedder.embed_text("contract termination")
        );
    }

    #[test]
    fn test_shared_tokens_increase_similarity() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed_text("notice period for contract termination");
        let related = embedder.embed_text("the contract termination notice period is three months");
        let unrelated = embedder.embed_text("bananas grow in tropical climates");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }
}
