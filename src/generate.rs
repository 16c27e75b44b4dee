//! Ollama-compatible [`GenerationBackend`].
//!
//! Sends `POST {url}/api/generate` with `{model, prompt, stream: false}` and
//! reads the `response` field. Transport failures are classified so callers
//! can tell "backend not running" apart from "backend misbehaved":
//!
//! | Failure | Error |
//! |---------|-------|
//! | connection refused / DNS | [`RagError::BackendUnavailable`] |
//! | timeout | [`RagError::Backend`] |
//! | non-2xx status | [`RagError::Backend`] |
//! | body without `response` | [`RagError::Backend`] |

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use knowledge_rag_core::generate::GenerationBackend;
use knowledge_rag_core::RagError;

use crate::config::GenerationConfig;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

pub struct OllamaBackend {
    url: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn unavailable(&self) -> RagError {
        RagError::BackendUnavailable(format!(
            "Could not connect to the generation backend at {}. \
             Make sure Ollama is running: ollama serve",
            self.url
        ))
    }

    fn classify(&self, err: reqwest::Error) -> RagError {
        if err.is_timeout() {
            RagError::Backend(format!(
                "generation request to {} timed out after {} s",
                self.url, self.timeout_secs
            ))
        } else if err.is_connect() {
            self.unavailable()
        } else {
            RagError::Backend(format!("generation request failed: {}", err))
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "sending generation request");

        let response = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RagError::Backend(format!(
                "generation backend returned {}: {}",
                status, body_text
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| self.classify(e))?;

        parsed.response.ok_or_else(|| {
            RagError::Backend("generation response is missing the 'response' field".to_string())
        })
    }
}
