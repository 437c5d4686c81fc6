//! Configuration for docbrain.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (DOCBRAIN_ENDPOINT, DOCBRAIN_MODEL, DOCBRAIN_MAX_ITERATIONS)
//! 2. Config file (.docbrain/config.yaml)
//! 3. Defaults
//!
//! Config file discovery searches the current directory and parents for
//! .docbrain/config.yaml.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default OpenAI-compatible endpoint (Groq)
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default model identity
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Default environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "GROQ_API_KEY";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub generation: Option<GenerationSection>,
    #[serde(default)]
    pub pipeline: Option<PipelineSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationSection {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineSection {
    pub max_iterations: Option<u32>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Generation backend settings
    pub generation: GenerationSettings,
    /// Pipeline settings
    pub pipeline: PipelineSettings,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_seconds: 45,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_iterations: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { max_iterations: 2 }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".docbrain").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let (mut generation, mut pipeline) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;
        let section = config.generation.unwrap_or_default();
        let defaults = GenerationSettings::default();

        let generation = GenerationSettings {
            endpoint: section.endpoint.unwrap_or(defaults.endpoint),
            model: section.model.unwrap_or(defaults.model),
            api_key_env: section.api_key_env.unwrap_or(defaults.api_key_env),
            timeout_seconds: section.timeout_seconds.unwrap_or(defaults.timeout_seconds),
            max_attempts: section.max_attempts.unwrap_or(defaults.max_attempts),
        };

        let pipeline = PipelineSettings {
            max_iterations: config
                .pipeline
                .and_then(|p| p.max_iterations)
                .unwrap_or_else(|| PipelineSettings::default().max_iterations),
        };

        (generation, pipeline)
    } else {
        (GenerationSettings::default(), PipelineSettings::default())
    };

    // Environment variables take precedence over the config file
    if let Ok(endpoint) = std::env::var("DOCBRAIN_ENDPOINT") {
        generation.endpoint = endpoint;
    }
    if let Ok(model) = std::env::var("DOCBRAIN_MODEL") {
        generation.model = model;
    }
    if let Ok(iters) = std::env::var("DOCBRAIN_MAX_ITERATIONS") {
        pipeline.max_iterations = iters
            .parse()
            .context("DOCBRAIN_MAX_ITERATIONS must be a non-negative integer")?;
    }

    Ok(ResolvedConfig {
        generation,
        pipeline,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let generation = GenerationSettings::default();

        assert_eq!(generation.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(generation.model, DEFAULT_MODEL);
        assert_eq!(generation.api_key_env, "GROQ_API_KEY");
        assert_eq!(PipelineSettings::default().max_iterations, 2);
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let docbrain_dir = temp.path().join(".docbrain");
        std::fs::create_dir_all(&docbrain_dir).unwrap();

        let config_path = docbrain_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
generation:
  model: llama-3.1-8b-instant
  timeout_seconds: 30
pipeline:
  max_iterations: 4
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");

        let generation = config.generation.unwrap();
        assert_eq!(generation.model, Some("llama-3.1-8b-instant".to_string()));
        assert_eq!(generation.timeout_seconds, Some(30));
        assert_eq!(generation.endpoint, None);
        assert_eq!(config.pipeline.unwrap().max_iterations, Some(4));
    }

    #[test]
    fn test_partial_section_falls_back_to_defaults() {
        let section = GenerationSection {
            model: Some("custom".to_string()),
            ..Default::default()
        };
        let defaults = GenerationSettings::default();

        let resolved = GenerationSettings {
            endpoint: section.endpoint.unwrap_or(defaults.endpoint),
            model: section.model.unwrap_or(defaults.model),
            api_key_env: section.api_key_env.unwrap_or(defaults.api_key_env),
            timeout_seconds: section.timeout_seconds.unwrap_or(defaults.timeout_seconds),
            max_attempts: section.max_attempts.unwrap_or(defaults.max_attempts),
        };

        assert_eq!(resolved.model, "custom");
        assert_eq!(resolved.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(resolved.max_attempts, 3);
    }
}
