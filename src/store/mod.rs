
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::RagError;

/// Metadata for one indexed chunk. Position `i` in the metadata sequence
/// always corresponds to the `i`-th vector in the index, across all runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkRecord {
    /// Source filename the chunk was extracted from
    pub file: String,
    /// The chunk text
    pub chunk: String,
}

/// Flat embedding index: row-major `f32` matrix with exhaustive
/// nearest-neighbor scan by squared Euclidean distance.
#[derive(Debug, Serialize, Deserialize)]
struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn push(&mut self, vector: &[f32]) {
        debug_assert_eq!(vector.len(), self.dimension);
        self.data.extend_from_slice(vector);
    }

    /// Indices and distances of the `k` rows nearest to `query`, nearest
    /// first.
    fn search(&self, query: &[f32], k: usize) -> Vec<(usize, f32)> {
        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .map(|row| squared_distance(row, query))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(k);
        scored
    }
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Owns the embedding index and the parallel chunk-metadata sequence.
///
/// The index is persisted as a unit to one file (bincode) and the metadata
/// sequence to a sibling JSON file, in insertion order. The two files are
/// only valid together; a length mismatch on load is an error because the
/// position correspondence cannot be repaired after the fact.
#[derive(Debug)]
pub struct VectorStore {
    index: FlatIndex,
    records: Vec<ChunkRecord>,
    index_path: PathBuf,
    records_path: PathBuf,
}

impl VectorStore {
    /// Open the store, loading any persisted state. `dimension` is fixed for
    /// the lifetime of the index; a persisted index with a different
    /// dimension is rejected.
    #[inline]
    pub fn open(dimension: usize, index_path: &Path, records_path: &Path) -> Result<Self> {
        let index = if index_path.exists() {
            let bytes = fs::read(index_path)
                .with_context(|| format!("Failed to read {}", index_path.display()))?;
            bincode::deserialize::<FlatIndex>(&bytes)
                .with_context(|| format!("Corrupt vector index {}", index_path.display()))?
        } else {
            FlatIndex::new(dimension)
        };

        let records: Vec<ChunkRecord> = if records_path.exists() {
            let content = fs::read_to_string(records_path)
                .with_context(|| format!("Failed to read {}", records_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Corrupt chunk metadata {}", records_path.display()))?
        } else {
            Vec::new()
        };

        if index.len() != records.len() {
            return Err(RagError::Store(format!(
                "Index holds {} vectors but metadata holds {} chunks; the files must be \
                 rebuilt together",
                index.len(),
                records.len()
            ))
            .into());
        }

        let mut index = index;
        if index.dimension != dimension {
            if index.data.is_empty() {
                // Nothing indexed yet; adopt the configured dimension.
                index.dimension = dimension;
            } else {
                return Err(RagError::Store(format!(
                    "Index was built with dimension {} but the embedding model produces {}",
                    index.dimension, dimension
                ))
                .into());
            }
        }

        debug!(
            "Opened vector store with {} entries (dimension {})",
            records.len(),
            dimension
        );
        Ok(Self {
            index,
            records,
            index_path: index_path.to_path_buf(),
            records_path: records_path.to_path_buf(),
        })
    }

    /// Append vectors and their chunk metadata in lock-step.
    ///
    /// All-or-nothing: length and dimension mismatches are rejected before
    /// either side is touched.
    #[inline]
    pub fn add(&mut self, vectors: &[Vec<f32>], chunks: Vec<ChunkRecord>) -> Result<()> {
        if vectors.len() != chunks.len() {
            return Err(RagError::Store(format!(
                "Got {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            ))
            .into());
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.index.dimension) {
            return Err(RagError::Store(format!(
                "Embedding dimension {} does not match index dimension {}",
                bad.len(),
                self.index.dimension
            ))
            .into());
        }

        for vector in vectors {
            self.index.push(vector);
        }
        self.records.extend(chunks);

        debug_assert_eq!(self.index.len(), self.records.len());
        Ok(())
    }

    /// The `k` nearest chunks to `query`, nearest first. Returns fewer than
    /// `k` results when the store is smaller than `k`.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(ChunkRecord, f32)>> {
        if query.len() != self.index.dimension {
            return Err(RagError::Store(format!(
                "Query dimension {} does not match index dimension {}",
                query.len(),
                self.index.dimension
            ))
            .into());
        }

        let hits = self
            .index
            .search(query, k)
            .into_iter()
            .map(|(i, distance)| (self.records[i].clone(), distance))
            .collect();
        Ok(hits)
    }

    /// Write the index and the metadata sequence to disk.
    #[inline]
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let bytes = bincode::serialize(&self.index).context("Failed to encode vector index")?;
        fs::write(&self.index_path, bytes)
            .with_context(|| format!("Failed to write {}", self.index_path.display()))?;

        let content = serde_json::to_string_pretty(&self.records)
            .context("Failed to encode chunk metadata")?;
        fs::write(&self.records_path, content)
            .with_context(|| format!("Failed to write {}", self.records_path.display()))?;

        info!("Persisted {} index entries", self.records.len());
        Ok(())
    }

    /// Number of indexed chunks.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The fixed embedding dimension of this index.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.index.dimension
    }
}
