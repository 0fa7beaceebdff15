#[cfg(test)]
mod tests;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::chunking::{ChunkingConfig, chunk_document};
use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::extract::{DocumentFormat, extract_text};
use crate::store::{ChunkRecord, VectorStore};
use crate::tracker::{ChangeTracker, modification_nanos};

/// A file found in the watched folder with a recognized format.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub name: String,
    pub path: PathBuf,
    pub format: DocumentFormat,
    pub mtime: u64,
}

/// Outcome of processing one file. Failures are values, not unwound errors:
/// a failed file is logged and retried on the next run because its change
/// record is never written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Chunks were embedded and indexed (possibly zero for an empty file)
    Indexed { chunks: usize },
    /// The change record matched; nothing to do
    Skipped,
    /// Extraction, embedding, or indexing failed; retried next run
    Failed { reason: String },
}

/// Summary of one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    pub outcomes: Vec<(String, FileOutcome)>,
}

impl IngestReport {
    #[inline]
    pub fn indexed_files(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, FileOutcome::Indexed { .. }))
            .count()
    }

    #[inline]
    pub fn skipped_files(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == FileOutcome::Skipped)
            .count()
    }

    #[inline]
    pub fn failed_files(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, FileOutcome::Failed { .. }))
            .count()
    }

    #[inline]
    pub fn chunks_added(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                FileOutcome::Indexed { chunks } => *chunks,
                _ => 0,
            })
            .sum()
    }
}

/// Brings the vector store up to date with the watched folder.
///
/// Per run: Discover, then per file Skip | Extract → Chunk → Embed → Index →
/// RecordModTime, persisting store and change records after each completed
/// file so partial progress survives a crash.
pub struct IngestionPipeline<'a, E: EmbeddingProvider> {
    docs_dir: PathBuf,
    chunking: ChunkingConfig,
    tracker: ChangeTracker,
    store: VectorStore,
    embedder: &'a E,
}

impl<'a, E: EmbeddingProvider> IngestionPipeline<'a, E> {
    /// Open the pipeline's persisted state (change records, vector store).
    #[inline]
    pub fn new(config: &Config, embedder: &'a E) -> Result<Self> {
        let base_dir = config.base_dir()?;
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("Failed to create {}", base_dir.display()))?;

        let tracker = ChangeTracker::load(&config.filemeta_path()?);
        let store = VectorStore::open(
            embedder.dimension(),
            &config.index_path()?,
            &config.chunks_path()?,
        )?;

        Ok(Self {
            docs_dir: config.docs_dir.clone(),
            chunking: config.chunking.clone(),
            tracker,
            store,
            embedder,
        })
    }

    /// List regular files in the watched folder (non-recursive) with a
    /// recognized extension, sorted by name for deterministic runs.
    #[inline]
    pub fn discover(&self) -> Result<Vec<DiscoveredFile>> {
        let entries = fs::read_dir(&self.docs_dir)
            .with_context(|| format!("Failed to read folder {}", self.docs_dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            let metadata = entry
                .metadata()
                .with_context(|| format!("Failed to stat {}", path.display()))?;
            if !metadata.is_file() {
                continue;
            }

            let Some(format) = DocumentFormat::from_path(&path) else {
                debug!("Skipping unsupported file {}", path.display());
                continue;
            };
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                debug!("Skipping file with non-UTF-8 name {}", path.display());
                continue;
            };

            files.push(DiscoveredFile {
                name: name.to_string(),
                path: path.clone(),
                format,
                mtime: modification_nanos(&metadata)?,
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Process one discovered file to completion.
    #[inline]
    pub fn process(&mut self, file: &DiscoveredFile) -> FileOutcome {
        if !self.tracker.should_process(&file.name, file.mtime) {
            debug!("Skipping unchanged file {}", file.name);
            return FileOutcome::Skipped;
        }

        info!("Processing {}", file.name);
        match self.ingest_file(file) {
            Ok(chunks) => FileOutcome::Indexed { chunks },
            Err(e) => {
                warn!("Error processing {}: {:#}", file.name, e);
                FileOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        }
    }

    fn ingest_file(&mut self, file: &DiscoveredFile) -> Result<usize> {
        let text = extract_text(&file.path, file.format)?;
        let chunks = chunk_document(file.format, &text, &self.chunking);

        if !chunks.is_empty() {
            let vectors = self
                .embedder
                .embed_batch(&chunks)
                .context("Failed to embed chunks")?;

            let records = chunks
                .iter()
                .map(|chunk| ChunkRecord {
                    file: file.name.clone(),
                    chunk: chunk.clone(),
                })
                .collect();
            self.store.add(&vectors, records)?;

            // Persist immediately so a crash on a later file loses nothing.
            self.store.persist()?;
        }

        // Only now is the file considered processed; any failure above left
        // the change record untouched for a retry next run.
        self.tracker.mark_processed(&file.name, file.mtime);
        if let Err(e) = self.tracker.persist() {
            warn!("Failed to persist change records: {:#}", e);
        }

        Ok(chunks.len())
    }

    /// Run the full state machine over the folder.
    #[inline]
    pub fn run(&mut self) -> Result<IngestReport> {
        let files = self.discover()?;
        info!("Discovered {} candidate files", files.len());

        let mut report = IngestReport::default();
        for file in &files {
            let outcome = self.process(file);
            report.outcomes.push((file.name.clone(), outcome));
        }

        self.tracker.persist()?;
        info!(
            "Ingestion complete: {} indexed, {} skipped, {} failed, {} chunks added",
            report.indexed_files(),
            report.skipped_files(),
            report.failed_files(),
            report.chunks_added()
        );
        Ok(report)
    }

    /// The vector store, for retrieval over freshly ingested state.
    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }
}
