//! OpenAI-compatible chat-completions backend.
//!
//! Defaults to Groq's OpenAI-compatible endpoint. Each call runs with a
//! bounded retry budget and validates the returned content (non-empty, no
//! stray control tokens) before handing it to a worker.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::GenerationSettings;

use super::{GenerationBackend, GenerationError, RetryPolicy};

/// Markers that indicate the model leaked control tokens into its output
const CONTROL_TOKENS: [&str; 2] = ["<s>", "<|"];

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Generation backend speaking the OpenAI chat-completions protocol
pub struct OpenAiBackend {
    endpoint: String,
    model: String,
    api_key: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiBackend {
    /// Create a backend with explicit parameters
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            retry,
            client,
        })
    }

    /// Create a backend from resolved settings, reading the API key from
    /// the configured environment variable
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).with_context(|| {
            format!("{} environment variable required", settings.api_key_env)
        })?;

        Self::new(
            settings.endpoint.clone(),
            settings.model.clone(),
            api_key,
            Duration::from_secs(settings.timeout_seconds),
            RetryPolicy {
                max_attempts: settings.max_attempts,
                ..Default::default()
            },
        )
    }

    /// One request/response round trip, without retry
    async fn request_once(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            // Slight temperature helps models avoid empty output
            temperature: 0.1,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let body = response.text().await?;
        parse_chat_content(&body)
    }
}

/// Decode a chat-completions body and pull out the first choice's content.
/// A body that fails to decode or carries no choices is a malformed
/// response, not a transport failure.
fn parse_chat_content(body: &str) -> Result<String, GenerationError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|_| GenerationError::MalformedResponse)?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or(GenerationError::MalformedResponse)?;

    validate_content(&content)?;
    Ok(content)
}

/// Reject empty output and leaked control tokens
fn validate_content(content: &str) -> Result<(), GenerationError> {
    if content.trim().is_empty() {
        return Err(GenerationError::InvalidContent);
    }

    if CONTROL_TOKENS.iter().any(|t| content.contains(t)) {
        return Err(GenerationError::InvalidContent);
    }

    Ok(())
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match self.request_once(prompt).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    if !self.retry.should_retry(attempt) {
                        return Err(e);
                    }

                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Generation attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_validation_accepts_text() {
        assert!(validate_content("a node list").is_ok());
    }

    #[test]
    fn test_content_validation_rejects_empty() {
        assert!(matches!(
            validate_content("   \n  "),
            Err(GenerationError::InvalidContent)
        ));
    }

    #[test]
    fn test_content_validation_rejects_control_tokens() {
        assert!(matches!(
            validate_content("<s> leaked"),
            Err(GenerationError::InvalidContent)
        ));
        assert!(matches!(
            validate_content("text <|eot|> more"),
            Err(GenerationError::InvalidContent)
        ));
    }

    #[test]
    fn test_parse_chat_content_happy_path() {
        let body = r#"{"choices":[{"message":{"content":"a node list"}}]}"#;
        assert_eq!(parse_chat_content(body).unwrap(), "a node list");
    }

    #[test]
    fn test_undecodable_body_is_malformed_not_transport() {
        assert!(matches!(
            parse_chat_content("<html>gateway timeout</html>"),
            Err(GenerationError::MalformedResponse)
        ));
    }

    #[test]
    fn test_body_without_choices_is_malformed() {
        assert!(matches!(
            parse_chat_content(r#"{"error":{"message":"overloaded"}}"#),
            Err(GenerationError::MalformedResponse)
        ));
    }

    #[test]
    fn test_backend_creation() {
        let backend = OpenAiBackend::new(
            "https://api.groq.com/openai/v1/chat/completions",
            "llama-3.3-70b-versatile",
            "test-key",
            Duration::from_secs(45),
            RetryPolicy::default(),
        )
        .unwrap();

        assert_eq!(backend.name(), "openai-compatible");
        assert_eq!(backend.model, "llama-3.3-70b-versatile");
    }
}
