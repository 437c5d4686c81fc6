//! Command-line interface for docbrain.
//!
//! Provides commands for running the pipeline over a document, serving the
//! streaming API, and inspecting resolved configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config;
use crate::core::{Orchestrator, PipelineConfig};
use crate::generation::OpenAiBackend;
use crate::ingest;
use crate::server;

/// docbrain - multi-agent document-to-diagram pipeline
#[derive(Parser, Debug)]
#[command(name = "docbrain")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline over a document and print the final artifact
    Run {
        /// Document to analyze (.pdf, .txt, .md, ...)
        #[arg(short, long)]
        input: PathBuf,

        /// Modeling directive, e.g. "model the inference path"
        directive: String,
    },

    /// Start the NDJSON streaming server
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:8000")]
        address: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run { input, directive } => run_document(&input, &directive).await,
            Commands::Serve { address } => {
                let config = config::config()?;
                server::serve(&address, config).await
            }
            Commands::Config => show_config(),
        }
    }
}

/// Ingest a document, run the pipeline, and print the result
async fn run_document(input: &Path, directive: &str) -> Result<()> {
    let config = config::config()?;

    let source_text = ingest::extract_path(input)
        .with_context(|| format!("Failed to ingest {}", input.display()))?;

    let backend = Arc::new(OpenAiBackend::from_settings(&config.generation)?);
    let orchestrator = Orchestrator::new(
        PipelineConfig::with_max_iterations(config.pipeline.max_iterations),
        backend,
    );

    match orchestrator
        .run_to_completion(source_text, directive.to_string())
        .await
    {
        Ok(artifact) => {
            println!("\n===== FINAL RESULT =====\n");
            println!("--- structure ---\n{}\n", artifact.structure);
            println!("--- relationships ---\n{}\n", artifact.relationships);
            println!("--- explanations ---\n{}", artifact.explanations);
            Ok(())
        }
        Err(e) => {
            eprintln!("\n[docbrain] Pipeline failed to produce a result: {e}");
            std::process::exit(1);
        }
    }
}

/// Print the resolved configuration
fn show_config() -> Result<()> {
    let config = config::config()?;

    println!("Endpoint:       {}", config.generation.endpoint);
    println!("Model:          {}", config.generation.model);
    println!("API key env:    {}", config.generation.api_key_env);
    println!("Timeout:        {}s", config.generation.timeout_seconds);
    println!("Max attempts:   {}", config.generation.max_attempts);
    println!("Max iterations: {}", config.pipeline.max_iterations);
    match &config.config_file {
        Some(path) => println!("Config file:    {}", path.display()),
        None => println!("Config file:    (none found)"),
    }

    Ok(())
}
