
use std::io::{BufRead, BufReader, Read};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::config::OllamaConfig;
use crate::retrieval::RetrievedChunk;

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Client for the Ollama generate API. Responses are streamed as
/// newline-delimited JSON fragments and concatenated in arrival order.
#[derive(Debug, Clone)]
pub struct GenerateClient {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateFragment {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

impl GenerateClient {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to build Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.generate_model.clone(),
            agent,
        })
    }

    /// Send `prompt` to the model and drain the streamed answer.
    ///
    /// Each response line is one JSON fragment; a fragment that fails to
    /// parse is logged and skipped without aborting the stream.
    #[inline]
    pub fn generate(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generate URL")?;

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: true,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generate request")?;

        debug!("Requesting generation from {} ({})", url, self.model);

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .context("Generation request failed")?;

        let reader = response.body_mut().as_reader();
        collect_fragments(reader)
    }
}

/// Concatenate the `response` fields of a newline-delimited fragment stream,
/// stopping at the `done` marker or EOF.
fn collect_fragments<R: Read>(reader: R) -> Result<String> {
    let mut answer = String::new();

    for line in BufReader::new(reader).lines() {
        let line = line.context("Failed to read generation stream")?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<GenerateFragment>(&line) {
            Ok(fragment) => {
                answer.push_str(&fragment.response);
                if fragment.done {
                    break;
                }
            }
            Err(e) => {
                warn!("Skipping unparseable generation fragment: {}", e);
            }
        }
    }

    Ok(answer.trim().to_string())
}

/// Assemble the grounding prompt: instructions, retrieved context, question.
#[inline]
pub fn build_prompt(context: &[RetrievedChunk], question: &str) -> String {
    let context_text = context
        .iter()
        .map(|hit| hit.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "You are an assistant. Use the following context to answer the question.\n\n\
         Context:\n{}\n\n\
         Question:\n{}\n\n\
         Answer:",
        context_text, question
    )
}
