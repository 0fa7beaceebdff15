use super::*;
use anyhow::anyhow;
use std::path::Path;
use tempfile::TempDir;

/// Deterministic embedding fake: a fixed-dimension vector derived from the
/// text's bytes.
struct ByteSums {
    dimension: usize,
}

impl EmbeddingProvider for ByteSums {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % self.dimension] += f32::from(byte);
        }
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Embedding fake that always errors, for failure-path tests.
struct BrokenEmbedder;

impl EmbeddingProvider for BrokenEmbedder {
    fn dimension(&self) -> usize {
        4
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(anyhow!("embedding model unavailable"))
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding model unavailable"))
    }
}

fn test_config(base: &Path, docs: &Path) -> Config {
    Config {
        docs_dir: docs.to_path_buf(),
        base_dir: Some(base.to_path_buf()),
        ..Config::default()
    }
}

fn write_docs(dir: &Path) {
    std::fs::write(
        dir.join("a.txt"),
        "First paragraph about apples.\n\nSecond paragraph about oranges.",
    )
    .expect("can write a.txt");

    let code: String = (0..25)
        .map(|i| format!("print({})", i))
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(dir.join("b.py"), code).expect("can write b.py");

    std::fs::write(dir.join("ignored.bin"), [0u8, 1, 2]).expect("can write ignored.bin");
}

#[test]
fn discover_finds_supported_files_sorted() {
    let base = TempDir::new().expect("can create temp dir");
    let docs = TempDir::new().expect("can create temp dir");
    write_docs(docs.path());

    let embedder = ByteSums { dimension: 4 };
    let pipeline = IngestionPipeline::new(&test_config(base.path(), docs.path()), &embedder)
        .expect("can create pipeline");

    let files = pipeline.discover().expect("can discover");
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.py"]);
    assert_eq!(files[0].format, DocumentFormat::PlainText);
    assert_eq!(files[1].format, DocumentFormat::Code);
}

#[test]
fn first_run_indexes_everything() {
    let base = TempDir::new().expect("can create temp dir");
    let docs = TempDir::new().expect("can create temp dir");
    write_docs(docs.path());

    let embedder = ByteSums { dimension: 4 };
    let mut pipeline = IngestionPipeline::new(&test_config(base.path(), docs.path()), &embedder)
        .expect("can create pipeline");

    let report = pipeline.run().expect("can run");

    assert_eq!(report.indexed_files(), 2);
    assert_eq!(report.skipped_files(), 0);
    assert_eq!(report.failed_files(), 0);
    // a.txt fits one paragraph chunk; b.py windows into two chunks.
    assert_eq!(report.chunks_added(), 3);
    assert_eq!(pipeline.store().len(), 3);
}

#[test]
fn second_run_is_idempotent() {
    let base = TempDir::new().expect("can create temp dir");
    let docs = TempDir::new().expect("can create temp dir");
    write_docs(docs.path());

    let embedder = ByteSums { dimension: 4 };
    let config = test_config(base.path(), docs.path());

    let first = IngestionPipeline::new(&config, &embedder)
        .expect("can create pipeline")
        .run()
        .expect("can run");
    assert_eq!(first.chunks_added(), 3);

    // A fresh pipeline reloads persisted state, as a new process would.
    let mut pipeline =
        IngestionPipeline::new(&config, &embedder).expect("can create pipeline");
    let second = pipeline.run().expect("can run");

    assert_eq!(second.indexed_files(), 0);
    assert_eq!(second.skipped_files(), 2);
    assert_eq!(second.chunks_added(), 0);
    assert_eq!(pipeline.store().len(), 3);
}

#[test]
fn modified_file_is_reprocessed() {
    let base = TempDir::new().expect("can create temp dir");
    let docs = TempDir::new().expect("can create temp dir");
    std::fs::write(docs.path().join("a.txt"), "original text").expect("can write");

    let embedder = ByteSums { dimension: 4 };
    let config = test_config(base.path(), docs.path());

    IngestionPipeline::new(&config, &embedder)
        .expect("can create pipeline")
        .run()
        .expect("can run");

    // Rewrite with a different mtime; filetimes are nanosecond-resolution,
    // so push it clearly forward.
    let path = docs.path().join("a.txt");
    std::fs::write(&path, "updated text").expect("can rewrite");
    let future = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
    let file = std::fs::File::options()
        .append(true)
        .open(&path)
        .expect("can open");
    file.set_modified(future).expect("can set mtime");

    let mut pipeline =
        IngestionPipeline::new(&config, &embedder).expect("can create pipeline");
    let report = pipeline.run().expect("can run");

    assert_eq!(report.indexed_files(), 1);
    // Append-only: the new chunk is added alongside the stale one.
    assert_eq!(pipeline.store().len(), 2);
}

#[test]
fn embedding_failure_leaves_file_eligible_for_retry() {
    let base = TempDir::new().expect("can create temp dir");
    let docs = TempDir::new().expect("can create temp dir");
    std::fs::write(docs.path().join("a.txt"), "some text").expect("can write");

    let config = test_config(base.path(), docs.path());

    let broken = BrokenEmbedder;
    let mut pipeline =
        IngestionPipeline::new(&config, &broken).expect("can create pipeline");
    let report = pipeline.run().expect("can run");

    assert_eq!(report.failed_files(), 1);
    assert_eq!(pipeline.store().len(), 0);

    // With a working embedder the same file is picked up again.
    let embedder = ByteSums { dimension: 4 };
    let mut pipeline =
        IngestionPipeline::new(&config, &embedder).expect("can create pipeline");
    let report = pipeline.run().expect("can run");

    assert_eq!(report.indexed_files(), 1);
    assert_eq!(pipeline.store().len(), 1);
}

#[test]
fn unreadable_file_fails_without_aborting_the_run() {
    let base = TempDir::new().expect("can create temp dir");
    let docs = TempDir::new().expect("can create temp dir");
    std::fs::write(docs.path().join("a.txt"), "good text").expect("can write");
    // Invalid UTF-8 makes extraction fail for this file only.
    std::fs::write(docs.path().join("bad.py"), [0xff, 0xfe, 0x00]).expect("can write");

    let embedder = ByteSums { dimension: 4 };
    let mut pipeline = IngestionPipeline::new(&test_config(base.path(), docs.path()), &embedder)
        .expect("can create pipeline");
    let report = pipeline.run().expect("can run");

    assert_eq!(report.indexed_files(), 1);
    assert_eq!(report.failed_files(), 1);
    assert_eq!(pipeline.store().len(), 1);

    let failed = report
        .outcomes
        .iter()
        .find(|(name, _)| name == "bad.py")
        .expect("bad.py has an outcome");
    assert!(matches!(failed.1, FileOutcome::Failed { .. }));
}

#[test]
fn whitespace_only_file_indexes_zero_chunks_once() {
    let base = TempDir::new().expect("can create temp dir");
    let docs = TempDir::new().expect("can create temp dir");
    std::fs::write(docs.path().join("blank.txt"), "   \n\n  \n").expect("can write");

    let embedder = ByteSums { dimension: 4 };
    let config = test_config(base.path(), docs.path());

    let mut pipeline =
        IngestionPipeline::new(&config, &embedder).expect("can create pipeline");
    let report = pipeline.run().expect("can run");
    assert_eq!(
        report.outcomes[0].1,
        FileOutcome::Indexed { chunks: 0 }
    );
    assert_eq!(pipeline.store().len(), 0);

    // The zero-chunk file was still recorded as processed.
    let mut pipeline =
        IngestionPipeline::new(&config, &embedder).expect("can create pipeline");
    let report = pipeline.run().expect("can run");
    assert_eq!(report.skipped_files(), 1);
}

#[test]
fn missing_docs_dir_is_an_error() {
    let base = TempDir::new().expect("can create temp dir");
    let embedder = ByteSums { dimension: 4 };
    let config = test_config(base.path(), Path::new("/nonexistent/docs-folder"));

    let mut pipeline =
        IngestionPipeline::new(&config, &embedder).expect("can create pipeline");
    assert!(pipeline.run().is_err());
}
