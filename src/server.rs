//! HTTP query server.
//!
//! Exposes the question-answering path as a small JSON API. The
//! [`AppContext`] is built once at startup and shared by every request;
//! collection readiness is checked per query, so a server started before
//! the first `kbrag ingest` begins answering as soon as ingestion finishes.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/query` | Answer `{ "query": "..." }` with `{ answer, sources, query }` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_ready", "message": "Document collection 'soc_docs' not found. ..." } }
//! ```
//!
//! | Code | Status | Cause |
//! |------|--------|-------|
//! | `bad_request` | 400 | empty query or malformed body |
//! | `not_ready` | 503 | collection has not been ingested |
//! | `backend_unavailable` | 503 | generation backend unreachable |
//! | `backend_error` | 502 | generation backend failed |
//! | `internal` | 500 | embedding or index failure |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use knowledge_rag_core::{AppContext, Answer, RagError};

use crate::config::Config;
use crate::context::build_context;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    ctx: Arc<AppContext>,
}

/// Starts the query server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let ctx = Arc::new(build_context(config).await?);

    match ctx.handle.ensure_ready().await {
        Ok(()) => {
            let entries = ctx.handle.index.count(&ctx.handle.collection).await?;
            info!(
                collection = %ctx.handle.collection,
                entries,
                "collection loaded"
            );
        }
        Err(RagError::NotReady(message)) => {
            warn!("{}", message);
        }
        Err(e) => return Err(e.into()),
    }

    let app = build_router(ctx);
    let bind_addr = config.server.bind.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Query server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router around an already-constructed context.
pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { ctx })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_ready"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let message = err.to_string();
        match err {
            RagError::Validation(_) => {
                AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
            }
            RagError::NotReady(_) => {
                AppError::new(StatusCode::SERVICE_UNAVAILABLE, "not_ready", message)
            }
            RagError::BackendUnavailable(_) => AppError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "backend_unavailable",
                message,
            ),
            RagError::Backend(_) => {
                AppError::new(StatusCode::BAD_GATEWAY, "backend_error", message)
            }
            RagError::Embedding(_) | RagError::Index(_) | RagError::Chunk(_) => {
                error!("query failed: {}", message);
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

/// Handler for `POST /api/query`.
async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Answer>, AppError> {
    let Json(request) =
        body.map_err(|e| AppError::new(StatusCode::BAD_REQUEST, "bad_request", e.body_text()))?;

    let answer = state.ctx.ask(&request.query).await?;
    Ok(Json(answer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use knowledge_rag_core::embedding::EmbeddingProvider;
    use knowledge_rag_core::generate::GenerationBackend;
    use knowledge_rag_core::retrieve::IndexHandle;
    use knowledge_rag_core::store::memory::InMemoryIndex;
    use knowledge_rag_core::store::VectorIndex;
    use knowledge_rag_core::{CollectionSpace, EntryMetadata, IndexedEntry};

    struct ConstEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ConstEmbedder {
        fn model_name(&self) -> &str {
            "const"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    enum FixedBackend {
        Answer(&'static str),
        Unavailable,
        Failing,
    }

    #[async_trait]
    impl GenerationBackend for FixedBackend {
        fn model_name(&self) -> &str {
            "fixed"
        }
        async fn generate(&self, _prompt: &str) -> Result<String, RagError> {
            match self {
                FixedBackend::Answer(s) => Ok(s.to_string()),
                FixedBackend::Unavailable => Err(RagError::BackendUnavailable("down".to_string())),
                FixedBackend::Failing => Err(RagError::Backend("boom".to_string())),
            }
        }
    }

    async fn serve(ingested: bool, backend: FixedBackend) -> String {
        serve_built_by(ingested.then_some("const"), backend).await
    }

    /// Serve a collection ingested by `model`, or none at all.
    async fn serve_built_by(model: Option<&str>, backend: FixedBackend) -> String {
        let index = Arc::new(InMemoryIndex::new());
        if let Some(model) = model {
            index
                .create_collection("soc_docs", &CollectionSpace::new(model, 2))
                .await
                .unwrap();
            index
                .add(
                    "soc_docs",
                    &[IndexedEntry {
                        id: "a.md_0".to_string(),
                        text: "Isolate the host.".to_string(),
                        metadata: EntryMetadata {
                            source: "a.md".to_string(),
                            title: "Alpha".to_string(),
                            chunk_index: 0,
                        },
                    }],
                    &[vec![1.0, 0.0]],
                )
                .await
                .unwrap();
        }
        let ctx = AppContext::new(
            IndexHandle::new(index, Arc::new(ConstEmbedder), "soc_docs"),
            Arc::new(backend),
            5,
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(Arc::new(ctx))).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn post_query(base: &str, body: serde_json::Value) -> (u16, serde_json::Value) {
        let resp = reqwest::Client::new()
            .post(format!("{}/api/query", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_query_success() {
        let base = serve(true, FixedBackend::Answer("Isolate it.")).await;
        let (status, body) = post_query(&base, serde_json::json!({"query": "what now?"})).await;
        assert_eq!(status, 200);
        assert_eq!(body["answer"], "Isolate it.");
        assert_eq!(body["sources"], serde_json::json!(["a.md"]));
        assert_eq!(body["query"], "what now?");
    }

    #[tokio::test]
    async fn test_empty_query_is_400() {
        let base = serve(true, FixedBackend::Answer("unused")).await;
        let (status, body) = post_query(&base, serde_json::json!({"query": "  "})).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "bad_request");
        assert_eq!(body["error"]["message"], "Query cannot be empty.");
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let base = serve(true, FixedBackend::Answer("unused")).await;
        let (status, body) = post_query(&base, serde_json::json!({"question": "x"})).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn test_not_ready_is_503() {
        let base = serve(false, FixedBackend::Answer("unused")).await;
        let (status, body) = post_query(&base, serde_json::json!({"query": "x"})).await;
        assert_eq!(status, 503);
        assert_eq!(body["error"]["code"], "not_ready");
    }

    #[tokio::test]
    async fn test_backend_errors_are_classified() {
        let base = serve(true, FixedBackend::Unavailable).await;
        let (status, body) = post_query(&base, serde_json::json!({"query": "x"})).await;
        assert_eq!(status, 503);
        assert_eq!(body["error"]["code"], "backend_unavailable");

        let base = serve(true, FixedBackend::Failing).await;
        let (status, body) = post_query(&base, serde_json::json!({"query": "x"})).await;
        assert_eq!(status, 502);
        assert_eq!(body["error"]["code"], "backend_error");
    }

    #[tokio::test]
    async fn test_collection_from_other_model_is_500() {
        let base = serve_built_by(Some("older-model"), FixedBackend::Answer("unused")).await;
        let (status, body) = post_query(&base, serde_json::json!({"query": "x"})).await;
        assert_eq!(status, 500);
        assert_eq!(body["error"]["code"], "internal");
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("older-model"), "message: {}", message);
        assert!(message.contains("kbrag ingest"), "message: {}", message);
    }

    #[tokio::test]
    async fn test_health() {
        let base = serve(false, FixedBackend::Answer("unused")).await;
        let body: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
