//! Retrieval of relevant passages for a query.

use crate::embedding::Embedder;
use crate::error::{RapportError, Result};
use crate::passages::{Chunk, PassageStore};
use crate::vector_index::VectorIndex;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Ordered chunk texts judged relevant to one query.
pub type RetrievalResult = Vec<String>;

/// A resolved hit with its provenance and distance.
#[derive(Debug, Clone)]
pub struct RetrievedPassage {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Encoder + index + passage store, composed into top-k retrieval.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    passages: Arc<PassageStore>,
}

impl Retriever {
    /// Create a retriever over components loaded at startup.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        passages: Arc<PassageStore>,
    ) -> Self {
        Self {
            embedder,
            index,
            passages,
        }
    }

    /// Encode the query, fetch `k` nearest neighbours and resolve them in rank order.
    ///
    /// Hits with no passage are dropped, so fewer than `k` results (or none) may come back.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        if k == 0 {
            return Err(RapportError::InvalidInput(
                "top-k must be at least 1".to_string(),
            ));
        }

        let query_embedding = self.embedder.embed(query).await?;
        let hits = self.index.search(&query_embedding, k)?;
        let raw_hits = hits.len();

        let passages: Vec<RetrievedPassage> = hits
            .into_iter()
            .filter_map(|hit| {
                self.passages.resolve(hit.id).map(|chunk| RetrievedPassage {
                    chunk: chunk.clone(),
                    distance: hit.distance,
                })
            })
            .collect();

        if passages.len() < raw_hits {
            debug!(
                "Dropped {} hits with no passage",
                raw_hits - passages.len()
            );
        }
        debug!("Retrieved {} passages", passages.len());

        Ok(passages)
    }

    /// Same walk as [`Retriever::search`], returning only the texts.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        Ok(self
            .search(query, k)
            .await?
            .into_iter()
            .map(|p| p.chunk.text)
            .collect())
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    pub fn passages(&self) -> &Arc<PassageStore> {
        &self.passages
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }
}
