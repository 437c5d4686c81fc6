//! HTTP transport boundary.
//!
//! `POST /api/generate` takes a multipart form (`prompt` + `file`), runs
//! the pipeline, and relays its events as newline-delimited JSON, one
//! serialized event per line, streamed as they are produced. Request
//! problems fail before any run starts; once the stream has started the
//! remote consumer always receives a terminal line.

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::StreamExt;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::core::{Orchestrator, PipelineConfig};
use crate::domain::PipelineEvent;
use crate::generation::OpenAiBackend;
use crate::ingest::{self, IngestError};

/// Bind and serve the API on the given address
pub async fn serve(address: &str, config: &ResolvedConfig) -> Result<()> {
    let backend = Arc::new(OpenAiBackend::from_settings(&config.generation)?);
    let orchestrator = Arc::new(Orchestrator::new(
        PipelineConfig::with_max_iterations(config.pipeline.max_iterations),
        backend,
    ));

    let app = router(orchestrator);

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    info!(%address, "docbrain server listening");
    axum::serve(listener, app).await.context("Server error")
}

/// Build the API router around a shared orchestrator
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate", post(generate))
        .layer(CorsLayer::permissive())
        .with_state(orchestrator)
}

async fn health() -> &'static str {
    "ok"
}

/// Run the pipeline for an uploaded document and stream its events as NDJSON
async fn generate(
    State(orchestrator): State<Arc<Orchestrator>>,
    mut multipart: Multipart,
) -> Response {
    let mut prompt: Option<String> = None;
    let mut upload: Option<(String, Bytes)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return status_error(StatusCode::BAD_REQUEST, e.to_string()),
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("prompt") => match field.text().await {
                Ok(text) => prompt = Some(text),
                Err(e) => return status_error(StatusCode::BAD_REQUEST, e.to_string()),
            },
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                match field.bytes().await {
                    Ok(bytes) => upload = Some((filename, bytes)),
                    Err(e) => return status_error(StatusCode::BAD_REQUEST, e.to_string()),
                }
            }
            _ => {}
        }
    }

    let Some(prompt) = prompt else {
        return status_error(StatusCode::BAD_REQUEST, "missing 'prompt' form field");
    };
    let Some((filename, bytes)) = upload else {
        return status_error(StatusCode::BAD_REQUEST, "missing 'file' form field");
    };

    // Ingestion failures reject the request before any worker runs
    let source_text = match ingest::extract_bytes(&filename, &bytes) {
        Ok(text) => text,
        Err(e @ (IngestError::Unsupported(_) | IngestError::Empty | IngestError::Malformed(_))) => {
            return status_error(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => return status_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let events = orchestrator.run(source_text, prompt);
    let body = Body::from_stream(events.map(|event| Ok::<_, Infallible>(event_line(&event))));

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(body)
    {
        Ok(response) => response,
        Err(e) => status_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// One serialized event per line. A serialization failure still produces a
/// terminal error line, so the remote consumer never sees a truncated
/// stream without explanation.
fn event_line(event: &PipelineEvent) -> String {
    let json = serde_json::to_string(event).unwrap_or_else(|e| {
        serde_json::json!({"type": "error", "message": e.to_string()}).to_string()
    });
    format!("{json}\n")
}

fn status_error(status: StatusCode, message: impl Into<String>) -> Response {
    let message: String = message.into();
    (status, message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FinalArtifact;

    #[test]
    fn test_event_line_is_newline_terminated_json() {
        let line = event_line(&PipelineEvent::log("Topology pass 1..."));

        assert!(line.ends_with('\n'));
        let parsed: PipelineEvent = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed, PipelineEvent::log("Topology pass 1..."));
    }

    #[test]
    fn test_result_line_round_trips() {
        let event = PipelineEvent::Result {
            data: FinalArtifact {
                structure: "NODES_V1".to_string(),
                relationships: "TOPO_V1".to_string(),
                explanations: "because".to_string(),
            },
        };

        let line = event_line(&event);
        let parsed: PipelineEvent = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed, event);
    }
}
