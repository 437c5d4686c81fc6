//! Events emitted during a pipeline run.
//!
//! Every run produces a finite, ordered sequence of events that ends with
//! exactly one terminal event (`Result` or `Error`). The wire format is one
//! JSON object per event: `{"type": "log", "message": ...}`,
//! `{"type": "result", "data": {...}}`, `{"type": "error", "message": ...}`.

use serde::{Deserialize, Serialize};

/// A single event in a pipeline run's event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// Progress announcement for a stage or convergence round
    Log { message: String },

    /// Terminal event carrying the final artifact
    Result { data: FinalArtifact },

    /// Terminal event carrying a failure message
    Error { message: String },
}

impl PipelineEvent {
    /// Create a log event
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
        }
    }

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result { .. } | Self::Error { .. })
    }
}

/// The combined artifact carried by the terminal `Result` event.
///
/// All three fields are opaque text produced by the workers; the pipeline
/// never parses them. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalArtifact {
    /// Node list and relationship-context narrative (converged draft)
    pub structure: String,

    /// Groups and directional relationships
    pub relationships: String,

    /// Prose justifications for nodes, relationships, and groups
    pub explanations: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_wire_format() {
        let event = PipelineEvent::log("Synthesizer: structure drafted.");
        let json = serde_json::to_string(&event).unwrap();

        assert_eq!(
            json,
            r#"{"type":"log","message":"Synthesizer: structure drafted."}"#
        );
    }

    #[test]
    fn test_result_wire_format() {
        let event = PipelineEvent::Result {
            data: FinalArtifact {
                structure: "nodes".to_string(),
                relationships: "edges".to_string(),
                explanations: "why".to_string(),
            },
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.starts_with(r#"{"type":"result","data":"#));

        let parsed: PipelineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_error_wire_format() {
        let event = PipelineEvent::error("rate limited");
        let json = serde_json::to_string(&event).unwrap();

        assert_eq!(json, r#"{"type":"error","message":"rate limited"}"#);
    }

    #[test]
    fn test_terminal_classification() {
        assert!(!PipelineEvent::log("working").is_terminal());
        assert!(PipelineEvent::error("boom").is_terminal());
        assert!(PipelineEvent::Result {
            data: FinalArtifact {
                structure: String::new(),
                relationships: String::new(),
                explanations: String::new(),
            }
        }
        .is_terminal());
    }
}
