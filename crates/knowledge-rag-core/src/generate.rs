//! Grounded answer generation.
//!
//! [`answer`] builds the prompt, makes exactly one call to the
//! [`GenerationBackend`], and attaches the de-duplicated list of sources.
//! Failures are returned as classified [`RagError`]s; nothing is retried.

use async_trait::async_trait;
use tracing::debug;

use crate::error::RagError;
use crate::models::{Answer, RetrievedChunk};
use crate::prompt::build_prompt;

/// A text-completion service.
///
/// Implementations perform one blocking (non-streaming) request per call,
/// bounded by their own timeout, and classify failures:
/// [`RagError::BackendUnavailable`] when the service cannot be reached,
/// [`RagError::Backend`] for anything else.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn model_name(&self) -> &str;
    async fn generate(&self, prompt: &str) -> Result<String, RagError>;
}

/// Distinct `source` values in first-seen order.
pub fn dedup_sources(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for c in chunks {
        if !sources.iter().any(|s| s == &c.source) {
            sources.push(c.source.clone());
        }
    }
    sources
}

/// Generate an answer to `query` grounded in `chunks`.
pub async fn answer(
    backend: &dyn GenerationBackend,
    query: &str,
    chunks: &[RetrievedChunk],
) -> Result<Answer, RagError> {
    let prompt = build_prompt(query, chunks);
    debug!(
        model = backend.model_name(),
        chunks = chunks.len(),
        prompt_chars = prompt.len(),
        "sending prompt to generation backend"
    );

    let text = backend.generate(&prompt).await?;

    Ok(Answer {
        answer: text,
        sources: dedup_sources(chunks),
        query: query.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn chunk(source: &str) -> RetrievedChunk {
        RetrievedChunk {
            text: format!("text from {}", source),
            source: source.to_string(),
            title: "T".to_string(),
            chunk_index: 0,
            distance: 0.0,
        }
    }

    /// Records prompts and replies with a canned outcome.
    struct ScriptedBackend {
        reply: fn() -> Result<String, RagError>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(reply: fn() -> Result<String, RagError>) -> Self {
            Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        fn model_name(&self) -> &str {
            "scripted"
        }
        async fn generate(&self, prompt: &str) -> Result<String, RagError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.reply)()
        }
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let chunks = vec![
            chunk("b.md"),
            chunk("a.md"),
            chunk("b.md"),
            chunk("c.md"),
            chunk("a.md"),
        ];
        assert_eq!(dedup_sources(&chunks), vec!["b.md", "a.md", "c.md"]);
    }

    #[test]
    fn test_dedup_empty() {
        assert!(dedup_sources(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_answer_success() {
        let backend = ScriptedBackend::new(|| Ok("Isolate the host.".to_string()));
        let chunks = vec![chunk("ir.md"), chunk("ir.md"), chunk("edr.md")];

        let answer = answer(&backend, "What first?", &chunks).await.unwrap();
        assert_eq!(answer.answer, "Isolate the host.");
        assert_eq!(answer.sources, vec!["ir.md", "edr.md"]);
        assert_eq!(answer.query, "What first?");

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0], build_prompt("What first?", &chunks));
    }

    #[tokio::test]
    async fn test_backend_unavailable_propagates_without_retry() {
        let backend = ScriptedBackend::new(|| {
            Err(RagError::BackendUnavailable(
                "Could not connect to the generation backend".to_string(),
            ))
        });
        let err = answer(&backend, "q", &[chunk("a.md")]).await.unwrap_err();
        assert!(matches!(err, RagError::BackendUnavailable(_)));
        assert_eq!(backend.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = ScriptedBackend::new(|| Err(RagError::Backend("HTTP 500".to_string())));
        let err = answer(&backend, "q", &[]).await.unwrap_err();
        assert!(matches!(err, RagError::Backend(_)));
    }
}
