
use anyhow::{Context, Result};
use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;

/// One retrieval hit: chunk text, its source file, and the squared Euclidean
/// distance to the query (lower is more similar).
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub file: String,
    pub text: String,
    pub distance: f32,
}

/// Embeds queries and returns the nearest indexed chunks.
pub struct RetrievalService<'a, E: EmbeddingProvider> {
    store: &'a VectorStore,
    embedder: &'a E,
}

impl<'a, E: EmbeddingProvider> RetrievalService<'a, E> {
    #[inline]
    pub fn new(store: &'a VectorStore, embedder: &'a E) -> Self {
        Self { store, embedder }
    }

    /// The top-`k` chunks for `query`, nearest first. An empty store returns
    /// an empty result without calling the embedding model.
    #[inline]
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if self.store.is_empty() {
            debug!("Vector store is empty, nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(query)
            .context("Failed to embed query")?;

        let hits = self.store.search(&query_vector, k)?;
        debug!("Retrieved {} chunks for query", hits.len());

        Ok(hits
            .into_iter()
            .map(|(record, distance)| RetrievedChunk {
                file: record.file,
                text: record.chunk,
                distance,
            })
            .collect())
    }
}
