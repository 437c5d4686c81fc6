//! Data structures shared across the pipeline.

pub mod events;

pub use events::{FinalArtifact, PipelineEvent};
