//! Passage store: chunk text and provenance keyed by index id.
//!
//! The metadata artifact is JSON, either a bare object keyed by stringified id
//! or an envelope carrying the build version:
//!
//! ```json
//! { "artifact_version": "2024-05-01",
//!   "passages": { "0": { "text": "...", "source": "contract.pdf" } } }
//! ```
//!
//! `source` may be a plain document name or `{document, page, section}`.

use crate::error::{RapportError, Result};
use crate::vector_index::VectorIndex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument};

/// Where a chunk came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawProvenance")]
pub struct Provenance {
    /// Source document name or path.
    pub document: String,
    /// Page number within the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Section heading.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProvenance {
    Label(String),
    Detailed {
        #[serde(alias = "file")]
        document: String,
        #[serde(default)]
        page: Option<u32>,
        #[serde(default)]
        section: Option<String>,
    },
}

impl From<RawProvenance> for Provenance {
    fn from(raw: RawProvenance) -> Self {
        match raw {
            RawProvenance::Label(document) => Self {
                document,
                page: None,
                section: None,
            },
            RawProvenance::Detailed {
                document,
                page,
                section,
            } => Self {
                document,
                page,
                section,
            },
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.document.is_empty() {
            write!(f, "unknown source")?;
        } else {
            write!(f, "{}", self.document)?;
        }
        if let Some(page) = self.page {
            write!(f, ", p. {}", page)?;
        }
        if let Some(section) = &self.section {
            write!(f, " ({})", section)?;
        }
        Ok(())
    }
}

/// One unit of source text, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chunk {
    pub id: u64,
    pub text: String,
    pub source: Provenance,
}

#[derive(Deserialize)]
struct PassageRecord {
    text: String,
    #[serde(default)]
    source: Provenance,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PassageFile {
    Versioned {
        #[serde(default)]
        artifact_version: Option<String>,
        passages: HashMap<String, PassageRecord>,
    },
    Bare(HashMap<String, PassageRecord>),
}

/// Loaded-once mapping from index id to [`Chunk`].
#[derive(Debug, Clone, Default)]
pub struct PassageStore {
    chunks: HashMap<u64, Chunk>,
    artifact_version: Option<String>,
}

impl PassageStore {
    /// Load the passage metadata artifact.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(RapportError::IndexNotFound(format!(
                "passage metadata {} does not exist",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let store = Self::from_json(&content)
            .map_err(|e| RapportError::CorruptArtifact(format!("{}: {}", path.display(), e)))?;

        info!("Loaded {} passages", store.len());
        Ok(store)
    }

    /// Parse passage metadata from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let file: PassageFile = serde_json::from_str(content)
            .map_err(|e| RapportError::CorruptArtifact(e.to_string()))?;

        let (artifact_version, records) = match file {
            PassageFile::Versioned {
                artifact_version,
                passages,
            } => (artifact_version, passages),
            PassageFile::Bare(passages) => (None, passages),
        };

        let mut chunks = HashMap::with_capacity(records.len());
        for (key, record) in records {
            let id: u64 = key.trim().parse().map_err(|_| {
                RapportError::CorruptArtifact(format!("passage key '{}' is not an integer id", key))
            })?;
            chunks.insert(
                id,
                Chunk {
                    id,
                    text: record.text,
                    source: record.source,
                },
            );
        }

        Ok(Self {
            chunks,
            artifact_version,
        })
    }

    /// Build a store from chunks already in memory.
    pub fn from_chunks(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        Self {
            chunks: chunks.into_iter().map(|c| (c.id, c)).collect(),
            artifact_version: None,
        }
    }

    /// Record the build version this store was produced with.
    pub fn with_artifact_version(mut self, version: Option<String>) -> Self {
        self.artifact_version = version;
        self
    }

    /// Look up a chunk; unknown ids are simply absent.
    pub fn resolve(&self, id: u64) -> Option<&Chunk> {
        self.chunks.get(&id)
    }

    /// Number of passages.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the store holds no passages.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Build version declared by the artifact.
    pub fn artifact_version(&self) -> Option<&str> {
        self.artifact_version.as_deref()
    }

    /// Check this store was built for `index`.
    ///
    /// Every passage id must exist in the index, and declared build versions
    /// must agree. Index ids without a passage are allowed.
    pub fn validate_against(&self, index: &dyn VectorIndex) -> Result<()> {
        if let (Some(ours), Some(theirs)) = (self.artifact_version(), index.artifact_version()) {
            if ours != theirs {
                return Err(RapportError::ArtifactMismatch(format!(
                    "passages are version {}, index is version {}",
                    ours, theirs
                )));
            }
        }

        let mut outside: Vec<u64> = self
            .chunks
            .keys()
            .copied()
            .filter(|id| !index.contains(*id))
            .collect();
        if !outside.is_empty() {
            outside.sort_unstable();
            outside.truncate(5);
            return Err(RapportError::ArtifactMismatch(format!(
                "passage ids {:?} are outside the index id space 0..{}",
                outside,
                index.len()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_index::{DistanceMetric, FlatIndex};

    fn index_of(len: usize, version: Option<&str>) -> FlatIndex {
        FlatIndex::new(1, DistanceMetric::L2, vec![vec![0.0]; len])
            .unwrap()
            .with_artifact_version(version.map(str::to_string))
    }

    #[test]
    fn test_load_bare_map() {
        let store = PassageStore::from_json(
            r#"{
                "0": {"text": "First passage", "source": "guide.pdf"},
                "3": {"text": "Fourth passage", "source": {"document": "guide.pdf", "page": 12}}
            }"#,
        )
        .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.resolve(0).unwrap().text, "First passage");
        assert_eq!(store.resolve(0).unwrap().source.document, "guide.pdf");
        assert_eq!(store.resolve(3).unwrap().source.page, Some(12));
        assert!(store.resolve(1).is_none());
        assert_eq!(store.artifact_version(), None);
    }

    #[test]
    fn test_load_versioned_envelope() {
        let store = PassageStore::from_json(
            r#"{
                "artifact_version": "v7",
                "passages": {"1": {"text": "Only passage"}}
            }"#,
        )
        .unwrap();

        assert_eq!(store.artifact_version(), Some("v7"));
        assert_eq!(store.resolve(1).unwrap().source, Provenance::default());
    }

    #[test]
    fn test_non_integer_key_is_corrupt() {
        let err = PassageStore::from_json(r#"{"abc": {"text": "x"}}"#).unwrap_err();
        assert!(matches!(err, RapportError::CorruptArtifact(_)));
    }

    #[test]
    fn test_invalid_json_is_corrupt() {
        let err = PassageStore::from_json("{not json").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_missing_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let err = PassageStore::load(&dir.path().join("passages.json")).unwrap_err();
        assert!(matches!(err, RapportError::IndexNotFound(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passages.json");
        std::fs::write(&path, r#"{"0": {"text": "hello", "source": "a.pdf"}}"#).unwrap();

        let store = PassageStore::load(&path).unwrap();
        assert_eq!(store.resolve(0).unwrap().text, "hello");
    }

    #[test]
    fn test_validate_against_index() {
        let store = PassageStore::from_json(r#"{"0": {"text": "a"}, "2": {"text": "c"}}"#).unwrap();
        assert!(store.validate_against(&index_of(3, None)).is_ok());

        let err = store.validate_against(&index_of(2, None)).unwrap_err();
        assert!(matches!(err, RapportError::ArtifactMismatch(_)));
    }

    #[test]
    fn test_validate_rejects_version_mismatch() {
        let store = PassageStore::from_chunks(vec![Chunk {
            id: 0,
            text: "a".to_string(),
            source: Provenance::default(),
        }])
        .with_artifact_version(Some("v1".to_string()));

        assert!(store.validate_against(&index_of(1, Some("v1"))).is_ok());
        assert!(store.validate_against(&index_of(1, None)).is_ok());
        assert!(matches!(
            store.validate_against(&index_of(1, Some("v2"))),
            Err(RapportError::ArtifactMismatch(_))
        ));
    }

    #[test]
    fn test_provenance_display() {
        let p = Provenance {
            document: "guide.pdf".to_string(),
            page: Some(4),
            section: Some("Scope".to_string()),
        };
        assert_eq!(p.to_string(), "guide.pdf, p. 4 (Scope)");
        assert_eq!(Provenance::default().to_string(), "unknown source");
    }
}
