//! docbrain - Multi-agent document-to-diagram pipeline
//!
//! Converts an unstructured document into a structured, explained diagram
//! model (nodes, typed relationships, logical groupings, and prose
//! justifications) by driving three text-generation workers through a
//! bounded critique/revision loop.
//!
//! # Architecture
//!
//! A run is a fixed staged protocol:
//! - The Synthesizer drafts a structural model from the source text
//! - Up to `max_iterations` (topology, critique) rounds refine it, exiting
//!   early when a critique reproduces the draft unchanged
//! - The Explainer turns the converged draft into prose justifications
//!
//! Progress is exposed as an ordered event stream that terminates with
//! exactly one `Result` or `Error` event, consumable by the CLI (batch) or
//! relayed line-by-line over HTTP as NDJSON.
//!
//! # Modules
//!
//! - `generation`: Text-generation backend (OpenAI-compatible HTTP)
//! - `core`: Orchestration logic (Orchestrator, Worker, prompts)
//! - `domain`: Data structures (PipelineEvent, FinalArtifact)
//! - `ingest`: Document-to-text extraction (PDF, plain text)
//! - `server`: NDJSON streaming HTTP boundary
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the pipeline over a document
//! docbrain run --input paper.pdf "model the inference path"
//!
//! # Serve the streaming API
//! docbrain serve --address 0.0.0.0:8000
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod generation;
pub mod ingest;
pub mod server;

// Re-export main types at crate root for convenience
pub use crate::core::{EventStream, Orchestrator, PipelineConfig, Worker, WorkerIdentity};
pub use crate::domain::{FinalArtifact, PipelineEvent};
pub use crate::generation::{GenerationBackend, GenerationError, OpenAiBackend};
pub use crate::ingest::IngestError;
