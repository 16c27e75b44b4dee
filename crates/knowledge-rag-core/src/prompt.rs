//! Grounded prompt assembly.
//!
//! The prompt is the system instruction, a context block with one segment
//! per retrieved chunk (in retrieval order, each tagged with its source
//! file), and the question. No truncation is applied: an oversized context
//! is passed through as-is.

use crate::models::RetrievedChunk;

/// Instruction that constrains the model to the supplied context.
pub const SYSTEM_PROMPT: &str = "You are an assistant for a Security Operations Center. \
Answer the question based ONLY on the provided context. \
If the context does not contain enough information to answer, say so clearly. \
Always cite which document(s) your answer comes from.";

/// Label prefixed to every context segment.
pub fn source_label(source: &str) -> String {
    format!("[Source: {}]", source)
}

/// Assemble the full prompt for `query` from `chunks`.
///
/// ```text
/// {SYSTEM_PROMPT}
///
/// Context:
/// [Source: a.md]
/// chunk text
///
/// [Source: b.md]
/// chunk text
///
/// Question: {query}
/// ```
pub fn build_prompt(query: &str, chunks: &[RetrievedChunk]) -> String {
    let context_block = chunks
        .iter()
        .map(|c| format!("{}\n{}", source_label(&c.source), c.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}",
        SYSTEM_PROMPT, context_block, query
    )
}
