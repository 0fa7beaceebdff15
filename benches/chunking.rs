use askdocs::chunking::{ChunkingConfig, chunk_document};
use askdocs::extract::DocumentFormat;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn prose_corpus() -> String {
    let paragraph = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
                     Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. \
                     Ut enim ad minim veniam, quis nostrud exercitation ullamco.";
    vec![paragraph; 400].join("\n\n")
}

fn code_corpus() -> String {
    (0..2000)
        .map(|i| format!("def function_{}(x):\n    return x + {}", i, i))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let config = ChunkingConfig::default();
    let prose = prose_corpus();
    let code = code_corpus();

    c.bench_function("chunk_paragraphs", |b| {
        b.iter(|| {
            chunk_document(
                DocumentFormat::PlainText,
                black_box(&prose),
                black_box(&config),
            )
        })
    });
    c.bench_function("chunk_lines", |b| {
        b.iter(|| chunk_document(DocumentFormat::Code, black_box(&code), black_box(&config)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
