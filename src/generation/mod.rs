//! Text-generation backend interface.
//!
//! The pipeline treats generation as an opaque capability: prompt in, text
//! out. Transient-failure handling (bounded retries with backoff) and
//! content validation live here, at the backend boundary, so the
//! orchestrator never retries internally.

pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export the default backend
pub use openai::OpenAiBackend;

/// Errors raised by a generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Network or timeout failure reaching the endpoint
    #[error("generation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status (rate limit, auth, ...)
    #[error("generation endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response parsed but carried no completion content
    #[error("generation response missing completion content")]
    MalformedResponse,

    /// Content was empty or contained stray control tokens
    #[error("generation backend returned empty or invalid content")]
    InvalidContent,
}

/// Stateless text-generation capability: maps a prompt to a response.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Generate a response for the given prompt
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Retry policy for failed generation calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay between retries in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier (delay *= multiplier after each retry)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_max_delay() -> u64 {
    30000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryPolicy {
    /// Calculate delay for a specific attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::from_millis(self.initial_delay_ms);
        }

        let delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);

        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// Check if we should retry based on attempt count
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy {
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 10000,
            ..Default::default()
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(8000));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(10000)); // Capped
    }

    #[test]
    fn test_retry_policy_attempt_budget() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        };

        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }
}
