use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::Config;
use crate::embeddings::{EmbeddingProvider, OllamaClient};
use crate::generation::{GenerateClient, build_prompt};
use crate::pipeline::{FileOutcome, IngestReport, IngestionPipeline};
use crate::retrieval::{RetrievalService, RetrievedChunk};
use crate::store::VectorStore;
use crate::tracker::ChangeTracker;

/// Bring the index up to date with the configured document folder.
#[inline]
pub fn index(config: &Config) -> Result<()> {
    let embedder = OllamaClient::new(&config.ollama)?;
    let mut pipeline = IngestionPipeline::new(config, &embedder)
        .context("Failed to open index state")?;

    let files = pipeline.discover()?;
    if files.is_empty() {
        println!(
            "No supported documents found in {}",
            style(config.docs_dir.display()).cyan()
        );
        return Ok(());
    }

    let progress = ProgressBar::new(files.len() as u64).with_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .context("Invalid progress template")?,
    );

    let mut report = IngestReport::default();
    for file in &files {
        progress.set_message(file.name.clone());
        let outcome = pipeline.process(file);
        if let FileOutcome::Failed { reason } = &outcome {
            progress.suspend(|| {
                println!(
                    "{} {}: {}",
                    style("✗").red(),
                    style(&file.name).bold(),
                    reason
                );
            });
        }
        report.outcomes.push((file.name.clone(), outcome));
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!(
        "Indexed {} file(s) ({} chunks), skipped {}, failed {}",
        style(report.indexed_files()).green(),
        style(report.chunks_added()).green(),
        style(report.skipped_files()).dim(),
        style(report.failed_files()).red()
    );
    println!("Index now holds {} chunks", style(pipeline.store().len()).cyan());

    Ok(())
}

/// Retrieval only: print the top-k chunks for a query.
#[inline]
pub fn search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let embedder = OllamaClient::new(&config.ollama)?;
    let store = open_store(config, &embedder)?;
    let service = RetrievalService::new(&store, &embedder);

    let k = limit.unwrap_or(config.retrieval.top_k);
    let hits = service.retrieve(query, k)?;

    if hits.is_empty() {
        println!("No results. Run {} first.", style("askdocs index").cyan());
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        println!(
            "{} {} {}",
            style(format!("{}.", rank + 1)).bold(),
            style(&hit.file).cyan(),
            style(format!("(distance {:.4})", hit.distance)).dim()
        );
        println!("{}\n", hit.text);
    }

    Ok(())
}

/// Retrieve context for a question and generate a grounded answer. With no
/// question, enter the interactive loop.
#[inline]
pub fn ask(config: &Config, question: Option<String>) -> Result<()> {
    let embedder = OllamaClient::new(&config.ollama)?;
    let store = open_store(config, &embedder)?;
    let service = RetrievalService::new(&store, &embedder);
    let generator = GenerateClient::new(&config.ollama)?;

    if let Some(question) = question {
        return answer_one(config, &service, &generator, &question);
    }

    loop {
        let question: String = Input::new()
            .with_prompt("🔍 Ask a question (or type 'exit')")
            .interact_text()?;
        let question = question.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }
        if question.is_empty() {
            continue;
        }
        answer_one(config, &service, &generator, question)?;
    }

    Ok(())
}

fn answer_one<E: EmbeddingProvider>(
    config: &Config,
    service: &RetrievalService<'_, E>,
    generator: &GenerateClient,
    question: &str,
) -> Result<()> {
    let hits = service.retrieve(question, config.retrieval.top_k)?;
    if hits.is_empty() {
        println!(
            "The index is empty. Run {} first.",
            style("askdocs index").cyan()
        );
        return Ok(());
    }

    info!("Answering with {} context chunks", hits.len());
    let prompt = build_prompt(&hits, question);

    // A generation failure is not fatal; the next question may succeed.
    match generator.generate(&prompt) {
        Ok(answer) if answer.is_empty() => {
            println!("{}", style("The model returned an empty answer.").yellow());
        }
        Ok(answer) => {
            println!("\n{}\n", answer);
            print_sources(&hits);
        }
        Err(e) => {
            warn!("Generation failed: {:#}", e);
            println!("{} {:#}", style("Could not generate an answer:").red(), e);
        }
    }

    Ok(())
}

fn print_sources(hits: &[RetrievedChunk]) {
    let mut files: Vec<&str> = hits.iter().map(|h| h.file.as_str()).collect();
    files.dedup();
    println!("{} {}", style("Sources:").dim(), style(files.join(", ")).dim());
}

/// Show the state of the index and the Ollama connection.
#[inline]
pub fn status(config: &Config) -> Result<()> {
    let embedder = OllamaClient::new(&config.ollama)?;

    println!("{}", style("📚 askdocs status").bold().cyan());
    println!();

    let store = open_store(config, &embedder)?;
    let tracker = ChangeTracker::load(&config.filemeta_path()?);
    println!("Indexed chunks: {}", style(store.len()).green());
    println!("Tracked files:  {}", style(tracker.len()).green());
    println!(
        "Document folder: {}",
        style(config.docs_dir.display()).cyan()
    );
    println!(
        "Index state: {}",
        style(config.base_dir()?.display()).dim()
    );

    print!("Ollama: ");
    match embedder.health_check() {
        Ok(()) => println!("{}", style("reachable").green()),
        Err(e) => println!("{} ({:#})", style("unreachable").red(), e),
    }

    Ok(())
}

fn open_store(config: &Config, embedder: &OllamaClient) -> Result<VectorStore> {
    VectorStore::open(
        embedder.dimension(),
        &config.index_path()?,
        &config.chunks_path()?,
    )
    .context("Failed to open the vector store")
}
