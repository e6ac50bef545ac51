//! Nearest-neighbour search over pre-embedded chunks.
//!
//! The index is built offline and loaded once; the core never inserts into it.
//! Hits are ranked by ascending distance, ties broken by ascending id.

pub(crate) mod sqlite;

pub use sqlite::{bytes_to_embedding, embedding_to_bytes, load_sqlite};

use crate::error::{RapportError, Result};
use serde::{Deserialize, Serialize};

/// One neighbour returned by a search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchHit {
    /// Chunk id (row position in the index).
    pub id: u64,
    /// Distance to the query (lower is closer).
    pub distance: f32,
}

/// Distance function the index was built for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// One minus cosine similarity.
    Cosine,
}

impl DistanceMetric {
    /// Distance between two equal-length vectors.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => squared_l2(a, b),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "cosine" => Ok(DistanceMetric::Cosine),
            _ => Err(format!("Unknown distance metric: {}", s)),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistanceMetric::L2 => write!(f, "l2"),
            DistanceMetric::Cosine => write!(f, "cosine"),
        }
    }
}

/// Read-only nearest-neighbour index keyed by ids `0..len()`.
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` hits ordered by ascending distance.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Vector dimension.
    fn dimensions(&self) -> usize;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// Whether the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` belongs to this index's id space.
    fn contains(&self, id: u64) -> bool {
        id < self.len() as u64
    }

    /// Distance function used for ranking.
    fn metric(&self) -> DistanceMetric;

    /// Build version recorded in the artifact, if any.
    fn artifact_version(&self) -> Option<&str> {
        None
    }
}

/// Exact brute-force index held in memory.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    metric: DistanceMetric,
    vectors: Vec<Vec<f32>>,
    artifact_version: Option<String>,
}

impl FlatIndex {
    /// Create an index; vector `i` gets id `i`.
    pub fn new(dimensions: usize, metric: DistanceMetric, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if dimensions == 0 {
            return Err(RapportError::VectorIndex(
                "Index dimension must be positive".to_string(),
            ));
        }
        if let Some((id, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions) {
            return Err(RapportError::VectorIndex(format!(
                "Vector {} has {} dimensions, expected {}",
                id,
                v.len(),
                dimensions
            )));
        }
        if let Some(id) = vectors.iter().position(|v| v.iter().any(|x| !x.is_finite())) {
            return Err(RapportError::VectorIndex(format!(
                "Vector {} has a NaN or infinite component",
                id
            )));
        }

        Ok(Self {
            dimensions,
            metric,
            vectors,
            artifact_version: None,
        })
    }

    /// Attach the build version recorded alongside the vectors.
    pub fn with_artifact_version(mut self, version: Option<String>) -> Self {
        self.artifact_version = version;
        self
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimensions {
            return Err(RapportError::VectorIndex(format!(
                "Query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| SearchHit {
                id: id as u64,
                distance: self.metric.distance(query, v),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits.truncate(k);

        Ok(hits)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    fn artifact_version(&self) -> Option<&str> {
        self.artifact_version.as_deref()
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Squared Euclidean distance.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index(metric: DistanceMetric) -> FlatIndex {
        FlatIndex::new(
            3,
            metric,
            vec![
                vec![0.0, 0.0, 1.0],
                vec![1.0, 0.0, 0.0],
                vec![0.9, 0.1, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.5, 0.5, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_search_orders_by_ascending_distance() {
        let index = sample_index(DistanceMetric::L2);
        let hits = index.search(&[1.0, 0.0, 0.0], 3).unwrap();

        let ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(hits[0].distance, 0.0);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_cosine_metric_ranking() {
        let index = sample_index(DistanceMetric::Cosine);
        let hits = index.search(&[2.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].id, 1);
        assert!(hits[0].distance.abs() < 1e-6);
        assert_eq!(hits[1].id, 2);
    }

    #[test]
    fn test_k_larger_than_index_returns_everything() {
        let index = sample_index(DistanceMetric::L2);
        let hits = index.search(&[0.0, 0.0, 1.0], 50).unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].id, 0);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let index = FlatIndex::new(
            2,
            DistanceMetric::L2,
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]],
        )
        .unwrap();
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].id, 0);
        assert_eq!(hits[1].id, 2);
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = sample_index(DistanceMetric::L2);
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(RapportError::VectorIndex(_))
        ));
    }

    #[test]
    fn test_rejects_ragged_vectors() {
        let result = FlatIndex::new(2, DistanceMetric::L2, vec![vec![1.0, 0.0], vec![1.0]]);
        assert!(result.is_err());
    }

    #[test]
    fn test_contains_uses_id_space() {
        let index = sample_index(DistanceMetric::L2);
        assert!(index.contains(0));
        assert!(index.contains(4));
        assert!(!index.contains(5));
        assert_eq!(index.len(), 5);
        assert!(!index.is_empty());
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("L2".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert_eq!("cosine".parse::<DistanceMetric>().unwrap(), DistanceMetric::Cosine);
        assert!("manhattan".parse::<DistanceMetric>().is_err());
        assert!("ip".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn test_rejects_non_finite_components() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let result = FlatIndex::new(2, DistanceMetric::L2, vec![vec![1.0, 0.0], vec![bad, 0.0]]);
            assert!(matches!(result, Err(RapportError::VectorIndex(_))));
        }
    }

    #[test]
    fn test_nan_query_does_not_panic() {
        let vectors = (0..64).map(|i| vec![i as f32, 1.0]).collect();
        let index = FlatIndex::new(2, DistanceMetric::Cosine, vectors).unwrap();

        let hits = index.search(&[f32::NAN, 1.0], 64).unwrap();
        assert_eq!(hits.len(), 64);
        let mut ids: Vec<u64> = hits.iter().map(|h| h.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..64).collect::<Vec<u64>>());
    }

    #[test]
    fn test_contains_large_id() {
        let index = sample_index(DistanceMetric::L2);
        assert!(!index.contains(u64::MAX));
        assert!(!index.contains(1 << 32));
    }
}
