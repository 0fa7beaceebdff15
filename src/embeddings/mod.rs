pub mod ollama;

pub use ollama::OllamaClient;

use anyhow::Result;

/// Narrow contract for the embedding model: text in, fixed-dimension vector
/// out. Implemented by [`OllamaClient`]; tests substitute deterministic
/// fakes.
pub trait EmbeddingProvider {
    /// The fixed output dimension. Must not change for the lifetime of an
    /// index built from this provider.
    fn dimension(&self) -> usize;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts, one vector per input, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
