//! Ollama HTTP transport for remote extraction.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{prompt, response, RemoteError, RemoteExtractor};
use crate::pipeline::parse::ParsedDocument;

const DEFAULT_MODEL: &str = "qwen2.5:7b";

/// Blocking client against a local Ollama instance. One request per
/// document, no retry; the orchestrator falls back to local results on
/// any failure.
pub struct OllamaExtractor {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaExtractor {
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
            timeout_secs,
        }
    }

    /// Default Ollama instance at localhost:11434 with a 90 second timeout.
    pub fn default_local() -> Self {
        Self::new("http://localhost:11434", 90)
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn generate(&self, prompt_text: &str) -> Result<String, RemoteError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: prompt_text,
            system: prompt::SYSTEM_INSTRUCTION,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                RemoteError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                RemoteError::Timeout(self.timeout_secs)
            } else {
                RemoteError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "extraction service returned error");
            return Err(RemoteError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;

        Ok(parsed.response)
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl RemoteExtractor for OllamaExtractor {
    fn extract(&self, filtered_text: &str) -> Result<ParsedDocument, RemoteError> {
        debug!(
            model = %self.model,
            chars = filtered_text.chars().count(),
            "sending document to extraction service"
        );
        let completion = self.generate(&prompt::build_prompt(filtered_text))?;
        response::parse_completion(&completion)
    }
}
