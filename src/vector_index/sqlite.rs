//! SQLite index artifact loader.
//!
//! The artifact holds two tables:
//!
//! ```sql
//! CREATE TABLE index_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
//! CREATE TABLE vectors (id INTEGER PRIMARY KEY, embedding BLOB NOT NULL);
//! ```
//!
//! `index_meta` must carry `dimensions`; `metric` and `artifact_version` are
//! optional. Embeddings are little-endian `f32` blobs and ids must be exactly
//! `0..N`. The whole table is read into a [`FlatIndex`] once.

use super::{DistanceMetric, FlatIndex};
use crate::error::{RapportError, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::Path;
use tracing::{info, instrument};

/// Largest vector dimension an artifact may declare.
pub const MAX_DIMENSIONS: usize = 65_536;

/// Load a persisted index artifact, failing fast if it is absent or corrupt.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_sqlite(path: &Path) -> Result<FlatIndex> {
    if !path.is_file() {
        return Err(RapportError::IndexNotFound(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| corrupt(path, e))?;

    let dimensions: usize = read_meta(&conn, path, "dimensions")?
        .ok_or_else(|| {
            RapportError::CorruptArtifact(format!(
                "{}: index_meta has no 'dimensions' entry",
                path.display()
            ))
        })?
        .trim()
        .parse()
        .map_err(|e| {
            RapportError::CorruptArtifact(format!(
                "{}: invalid 'dimensions' value: {}",
                path.display(),
                e
            ))
        })?;

    if dimensions == 0 || dimensions > MAX_DIMENSIONS {
        return Err(RapportError::CorruptArtifact(format!(
            "{}: 'dimensions' must be between 1 and {}, found {}",
            path.display(),
            MAX_DIMENSIONS,
            dimensions
        )));
    }
    let blob_len = dimensions.checked_mul(4).ok_or_else(|| {
        RapportError::CorruptArtifact(format!(
            "{}: 'dimensions' value {} is too large",
            path.display(),
            dimensions
        ))
    })?;

    let metric = match read_meta(&conn, path, "metric")? {
        Some(m) => m.parse::<DistanceMetric>().map_err(|e| {
            RapportError::CorruptArtifact(format!("{}: {}", path.display(), e))
        })?,
        None => DistanceMetric::default(),
    };

    let artifact_version = read_meta(&conn, path, "artifact_version")?;

    let mut stmt = conn
        .prepare("SELECT id, embedding FROM vectors ORDER BY id")
        .map_err(|e| corrupt(path, e))?;
    let rows = stmt
        .query_map([], |row| {
            let id: i64 = row.get(0)?;
            let bytes: Vec<u8> = row.get(1)?;
            Ok((id, bytes))
        })
        .map_err(|e| corrupt(path, e))?;

    let mut vectors = Vec::new();
    for row in rows {
        let (id, bytes) = row.map_err(|e| corrupt(path, e))?;
        let expected_id = vectors.len() as i64;
        if id != expected_id {
            return Err(RapportError::CorruptArtifact(format!(
                "{}: expected vector id {}, found {}",
                path.display(),
                expected_id,
                id
            )));
        }
        if bytes.len() != blob_len {
            return Err(RapportError::CorruptArtifact(format!(
                "{}: vector {} is {} bytes, expected {}",
                path.display(),
                id,
                bytes.len(),
                blob_len
            )));
        }
        vectors.push(bytes_to_embedding(&bytes));
    }

    let index = FlatIndex::new(dimensions, metric, vectors)
        .map_err(|e| RapportError::CorruptArtifact(format!("{}: {}", path.display(), e)))?
        .with_artifact_version(artifact_version);

    info!(
        "Loaded index with {} vectors ({} dimensions, {} metric)",
        super::VectorIndex::len(&index),
        dimensions,
        metric
    );

    Ok(index)
}

fn read_meta(conn: &Connection, path: &Path, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM index_meta WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| corrupt(path, e))
}

fn corrupt(path: &Path, e: rusqlite::Error) -> RapportError {
    RapportError::CorruptArtifact(format!("{}: {}", path.display(), e))
}

/// Serialize embedding to bytes.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from bytes.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
            f32::from_le_bytes(arr)
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::vector_index::VectorIndex;
    use rusqlite::params;

    /// Write an index artifact the way the offline builder does.
    pub(crate) fn write_artifact(
        path: &Path,
        dimensions: usize,
        metric: Option<&str>,
        version: Option<&str>,
        vectors: &[(i64, Vec<f32>)],
    ) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE index_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            CREATE TABLE vectors (id INTEGER PRIMARY KEY, embedding BLOB NOT NULL);
            "#,
        )
        .unwrap();
        conn.execute(
            "INSERT INTO index_meta (key, value) VALUES ('dimensions', ?1)",
            params![dimensions.to_string()],
        )
        .unwrap();
        if let Some(metric) = metric {
            conn.execute(
                "INSERT INTO index_meta (key, value) VALUES ('metric', ?1)",
                params![metric],
            )
            .unwrap();
        }
        if let Some(version) = version {
            conn.execute(
                "INSERT INTO index_meta (key, value) VALUES ('artifact_version', ?1)",
                params![version],
            )
            .unwrap();
        }
        for (id, v) in vectors {
            conn.execute(
                "INSERT INTO vectors (id, embedding) VALUES (?1, ?2)",
                params![id, embedding_to_bytes(v)],
            )
            .unwrap();
        }
    }

    #[test]
    fn test_load_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        write_artifact(
            &path,
            2,
            Some("cosine"),
            Some("2024-05-01"),
            &[(0, vec![1.0, 0.0]), (1, vec![0.0, 1.0]), (2, vec![0.7, 0.7])],
        );

        let index = load_sqlite(&path).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.dimensions(), 2);
        assert_eq!(index.metric(), DistanceMetric::Cosine);
        assert_eq!(index.artifact_version(), Some("2024-05-01"));

        let hits = index.search(&[0.0, 1.0], 1).unwrap();
        assert_eq!(hits[0].id, 1);
    }

    #[test]
    fn test_metric_defaults_to_l2() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        write_artifact(&path, 1, None, None, &[(0, vec![0.5])]);

        let index = load_sqlite(&path).unwrap();
        assert_eq!(index.metric(), DistanceMetric::L2);
        assert_eq!(index.artifact_version(), None);
    }

    #[test]
    fn test_missing_artifact_is_index_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_sqlite(&dir.path().join("absent.db")).unwrap_err();
        assert!(matches!(err, RapportError::IndexNotFound(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        std::fs::write(&path, b"definitely not a sqlite database, just some bytes").unwrap();

        let err = load_sqlite(&path).unwrap_err();
        assert!(matches!(err, RapportError::CorruptArtifact(_)));
    }

    #[test]
    fn test_gap_in_ids_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        write_artifact(&path, 1, None, None, &[(0, vec![0.1]), (2, vec![0.2])]);

        assert!(matches!(
            load_sqlite(&path),
            Err(RapportError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_wrong_blob_length_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        write_artifact(&path, 3, None, None, &[(0, vec![0.1, 0.2])]);

        assert!(matches!(
            load_sqlite(&path),
            Err(RapportError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_non_finite_vector_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let vectors: Vec<(i64, Vec<f32>)> = (0..64)
            .map(|i| {
                let v = if i % 3 == 0 { vec![f32::NAN, 0.0] } else { vec![1.0, i as f32] };
                (i, v)
            })
            .collect();
        write_artifact(&path, 2, None, None, &vectors);

        let err = load_sqlite(&path).unwrap_err();
        assert!(matches!(err, RapportError::CorruptArtifact(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_oversized_dimensions_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        for (name, dimensions) in [("max.db", usize::MAX), ("big.db", MAX_DIMENSIONS + 1)] {
            let path = dir.path().join(name);
            write_artifact(&path, dimensions, None, None, &[(0, vec![0.5])]);

            assert!(matches!(
                load_sqlite(&path),
                Err(RapportError::CorruptArtifact(_))
            ));
        }
    }

    #[test]
    fn test_zero_dimensions_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        write_artifact(&path, 0, None, None, &[]);

        assert!(matches!(
            load_sqlite(&path),
            Err(RapportError::CorruptArtifact(_))
        ));
    }

    #[test]
    fn test_embedding_bytes_codec() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&v)), v);
    }
}
