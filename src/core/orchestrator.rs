//! The convergence pipeline orchestrator.
//!
//! Drives three workers through the staged protocol
//! SYNTHESIZE -> {TOPOLOGIZE -> CRITIQUE}* -> EXPLAIN -> DONE and exposes
//! progress as an ordered, single-pass event stream. The critique loop is
//! bounded by `max_iterations`, never "until convergence", so cost stays
//! bounded against a non-deterministic backend.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use anyhow::{Context as _, Result};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use crate::domain::{FinalArtifact, PipelineEvent};
use crate::generation::GenerationBackend;

use super::prompts::{
    critique_prompt, explanation_prompt, synthesis_prompt, EXPLAINER_PREAMBLE,
    SYNTHESIZER_PREAMBLE, TOPOLOGIST_PREAMBLE,
};
use super::worker::{Worker, WorkerIdentity};

/// The instruction preambles for the three roles
#[derive(Debug, Clone)]
pub struct WorkerIdentities {
    pub synthesizer: WorkerIdentity,
    pub topologist: WorkerIdentity,
    pub explainer: WorkerIdentity,
}

impl Default for WorkerIdentities {
    fn default() -> Self {
        Self {
            synthesizer: WorkerIdentity::new("Synthesizer", SYNTHESIZER_PREAMBLE),
            topologist: WorkerIdentity::new("Topologist", TOPOLOGIST_PREAMBLE),
            explainer: WorkerIdentity::new("Explainer", EXPLAINER_PREAMBLE),
        }
    }
}

/// Configuration for an orchestrator, passed in explicitly so runs stay
/// isolated and testable
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Iteration ceiling for the critique loop.
    ///
    /// Exact-match convergence rarely fires against a non-deterministic
    /// backend, so in practice this ceiling is the real termination
    /// mechanism; the check only short-circuits byte-identical critiques.
    pub max_iterations: u32,

    /// Role preambles
    pub identities: WorkerIdentities,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            identities: WorkerIdentities::default(),
        }
    }
}

impl PipelineConfig {
    /// Default identities with a custom iteration ceiling
    pub fn with_max_iterations(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            ..Default::default()
        }
    }
}

/// The only mutable state of a single pipeline execution. Owned exclusively
/// by that run's driver task; never shared across runs.
struct RunState {
    draft: String,
    topology: String,
    iteration: u32,
}

/// Single-pass stream of events for one pipeline run.
///
/// Backed by a capacity-1 channel: the producer suspends until the consumer
/// takes the previous event, so at most one event is ever buffered.
/// Dropping the stream abandons the run safely; the driver task stops at
/// its next emission.
pub struct EventStream {
    inner: ReceiverStream<PipelineEvent>,
}

impl EventStream {
    /// Pull the next event, or `None` once the stream has ended
    pub async fn next(&mut self) -> Option<PipelineEvent> {
        self.inner.next().await
    }
}

impl Stream for EventStream {
    type Item = PipelineEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Pipeline orchestrator owning the three workers
pub struct Orchestrator {
    synthesizer: Worker,
    topologist: Worker,
    explainer: Worker,
    max_iterations: u32,
}

impl Orchestrator {
    /// Create an orchestrator from a config and a shared backend
    pub fn new(config: PipelineConfig, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            synthesizer: Worker::new(config.identities.synthesizer, Arc::clone(&backend)),
            topologist: Worker::new(config.identities.topologist, Arc::clone(&backend)),
            explainer: Worker::new(config.identities.explainer, backend),
            max_iterations: config.max_iterations,
        }
    }

    /// Start a pipeline run and return its event stream.
    ///
    /// The stream is produced step-by-step as each generation call
    /// completes, is not rewindable, and ends with exactly one `Result` or
    /// `Error` event. Restarting means calling `run` again.
    pub fn run(&self, source_text: String, directive: String) -> EventStream {
        let (tx, rx) = mpsc::channel(1);

        let run_id = Uuid::new_v4();
        let synthesizer = self.synthesizer.clone();
        let topologist = self.topologist.clone();
        let explainer = self.explainer.clone();
        let max_iterations = self.max_iterations;

        tokio::spawn(
            async move {
                info!("Starting pipeline run");

                let outcome = drive(
                    &synthesizer,
                    &topologist,
                    &explainer,
                    max_iterations,
                    &source_text,
                    &directive,
                    &tx,
                )
                .await;

                let terminal = match outcome {
                    Ok(artifact) => {
                        info!("Pipeline run completed");
                        PipelineEvent::Result { data: artifact }
                    }
                    Err(e) => {
                        info!(error = %e, "Pipeline run failed");
                        PipelineEvent::error(e.to_string())
                    }
                };

                // Send fails only if the consumer abandoned the stream
                let _ = tx.send(terminal).await;
            }
            .instrument(info_span!("pipeline_run", %run_id)),
        );

        EventStream {
            inner: ReceiverStream::new(rx),
        }
    }

    /// Collector mode: drain the stream, print each log with a fixed
    /// prefix, and return the final artifact or the failure.
    pub async fn run_to_completion(
        &self,
        source_text: String,
        directive: String,
    ) -> Result<FinalArtifact> {
        let mut stream = self.run(source_text, directive);
        let mut artifact = None;

        while let Some(event) = stream.next().await {
            match event {
                PipelineEvent::Log { message } => println!("[docbrain] {message}"),
                PipelineEvent::Result { data } => artifact = Some(data),
                PipelineEvent::Error { message } => anyhow::bail!("pipeline failed: {message}"),
            }
        }

        artifact.context("pipeline ended without a result")
    }
}

/// Emit a log event, failing if the consumer dropped the stream
async fn emit(tx: &mpsc::Sender<PipelineEvent>, message: impl Into<String>) -> Result<()> {
    tx.send(PipelineEvent::log(message))
        .await
        .map_err(|_| anyhow::anyhow!("event stream abandoned by consumer"))
}

/// Walk the staged protocol. Any worker failure aborts the run and becomes
/// the terminal `Error` event in the caller.
async fn drive(
    synthesizer: &Worker,
    topologist: &Worker,
    explainer: &Worker,
    max_iterations: u32,
    source_text: &str,
    directive: &str,
    tx: &mpsc::Sender<PipelineEvent>,
) -> Result<FinalArtifact> {
    // SYNTHESIZE
    emit(tx, "Synthesizer: synthesizing initial structure...").await?;

    let draft = synthesizer
        .invoke(&synthesis_prompt(directive, source_text))
        .await?;

    emit(tx, "Synthesizer: structure synthesized.").await?;

    let mut state = RunState {
        draft,
        topology: String::new(),
        iteration: 0,
    };

    // Convergence loop: the Topologist only ever sees the draft
    while state.iteration < max_iterations {
        let pass = state.iteration + 1;

        emit(tx, format!("Topologist: topology pass {pass}...")).await?;
        state.topology = topologist.invoke(&state.draft).await?;

        emit(tx, format!("Synthesizer: critique pass {pass}...")).await?;
        let candidate = synthesizer
            .invoke(&critique_prompt(&state.draft, &state.topology))
            .await?;

        state.iteration += 1;

        if candidate.trim() == state.draft.trim() {
            emit(tx, "Synthesizer: structure converged.").await?;
            debug!(iteration = state.iteration, "Converged early");
            break;
        }

        state.draft = candidate;
        emit(tx, "Synthesizer: revisions applied.").await?;
    }

    // EXPLAIN: non-convergence is not an error; proceed with the last draft
    emit(tx, "Explainer: writing technical explanations...").await?;

    let explanations = explainer
        .invoke(&explanation_prompt(
            &state.draft,
            &state.topology,
            source_text,
        ))
        .await?;

    emit(tx, "Pipeline complete.").await?;

    Ok(FinalArtifact {
        structure: state.draft,
        relationships: state.topology,
        explanations,
    })
}
