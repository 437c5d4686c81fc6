//! Orchestration core: workers, prompts, and the convergence pipeline.

pub mod orchestrator;
pub mod prompts;
pub mod worker;

pub use orchestrator::{EventStream, Orchestrator, PipelineConfig, WorkerIdentities};
pub use worker::{Worker, WorkerIdentity};
