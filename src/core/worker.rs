//! Worker: a named binding of an instruction preamble to the shared
//! generation backend.
//!
//! Workers are stateless across calls. All continuity between invocations
//! is carried explicitly by the orchestrator, so worker identities can be
//! shared freely across concurrent runs.

use std::sync::Arc;

use crate::generation::{GenerationBackend, GenerationError};

/// Immutable identity of a worker role
#[derive(Debug, Clone)]
pub struct WorkerIdentity {
    /// Role name (used in log events)
    pub name: String,

    /// Instruction preamble bound ahead of every invocation
    pub preamble: String,
}

impl WorkerIdentity {
    /// Create a new worker identity
    pub fn new(name: impl Into<String>, preamble: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            preamble: preamble.into(),
        }
    }
}

/// A single-purpose worker bound to the generation backend
#[derive(Clone)]
pub struct Worker {
    identity: WorkerIdentity,
    backend: Arc<dyn GenerationBackend>,
}

impl Worker {
    /// Create a worker from an identity and a shared backend
    pub fn new(identity: WorkerIdentity, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { identity, backend }
    }

    /// Role name of this worker
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Compose the preamble with user content and delegate to the backend.
    ///
    /// Backend failures propagate unmodified; the worker adds no retry or
    /// interpretation logic.
    pub async fn invoke(&self, user_content: &str) -> Result<String, GenerationError> {
        let prompt = format!("{}\n\n{}", self.identity.preamble, user_content);
        self.backend.generate(&prompt).await
    }
}
