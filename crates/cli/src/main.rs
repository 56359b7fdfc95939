//! Code Monster CLI entry point.
//!
//! This binary is the composition root. It loads `codemonster.toml`, wires
//! observability, builds the concrete oracles and hands them to a
//! [`stages::Orchestrator`]:
//!
//! | Port | Adapter |
//! |---|---|
//! | source | [`toolchain::DirectorySource`] |
//! | pattern | [`toolchain::StructuralPatternExtractor`] |
//! | generation | [`llm::HttpGenerationOracle`] |
//! | validation | [`toolchain::InterpreterValidator`] |
//!
//! Subcommands:
//!
//! - `run` starts the learning pipeline, logs a status snapshot periodically
//!   and stops gracefully on Ctrl-C.
//! - `generate` answers one generation request, optionally after letting the
//!   pipeline learn for a while first.

mod config;
mod observability;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use llm::HttpGenerationOracle;
use pipeline::{GenerationFailure, Language, LearningStatus, Oracles};
use stages::Orchestrator;
use toolchain::{DirectorySource, InterpreterValidator, StructuralPatternExtractor};
use tracing::{info, warn};

use crate::config::CliConfig;

/// Code Monster: learns code patterns from configured sources and generates
/// validated code on request.
#[derive(Parser, Debug)]
#[command(name = "codemonster")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "CODEMONSTER_CONFIG",
        default_value = "codemonster.toml"
    )]
    config: PathBuf,

    /// Bearer token sent to the generation endpoint
    #[arg(
        long,
        global = true,
        env = "CODEMONSTER_GENERATION_TOKEN",
        hide_env_values = true
    )]
    generation_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the learning pipeline until interrupted
    Run,

    /// Generate validated code for a prompt
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Target language tag (python, javascript, ...)
    #[arg(short, long, default_value = "python")]
    language: Language,

    /// Let the pipeline learn for this many seconds before generating
    #[arg(long, default_value_t = 0)]
    warmup_secs: u64,

    /// What the generated code should do
    prompt: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = CliConfig::load(&cli.config).await?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    let telemetry = observability::init(config.logging.format)?;
    if !found {
        warn!(path = %cli.config.display(), "Config file not found; using defaults");
    }

    let orchestrator = Orchestrator::new(
        config.pipeline.clone(),
        build_oracles(&config, cli.generation_token.clone()),
    )?;

    let outcome = match cli.command {
        Command::Run => run(&orchestrator, config.logging.status_interval())
            .await
            .map(|()| ExitCode::SUCCESS),
        Command::Generate(args) => generate(&orchestrator, args).await,
    };

    telemetry.shutdown();
    outcome
}

fn build_oracles(config: &CliConfig, generation_token: Option<String>) -> Oracles {
    let mut generation = HttpGenerationOracle::new(config.generation.endpoint.clone());
    if let Some(token) = generation_token {
        generation = generation.with_bearer_token(token);
    }

    Oracles {
        source: Arc::new(
            DirectorySource::new().with_max_file_bytes(config.collection.max_file_bytes),
        ),
        pattern: Arc::new(StructuralPatternExtractor::new()),
        generation: Arc::new(generation),
        validation: Arc::new(InterpreterValidator::new(config.validation.clone())),
    }
}

async fn run(orchestrator: &Orchestrator, status_interval: Duration) -> Result<()> {
    orchestrator.start()?;
    info!(
        sources = orchestrator.config().sources.len(),
        "Pipeline running; press Ctrl-C to stop"
    );

    let mut ticker = tokio::time::interval(status_interval);
    ticker.tick().await;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for Ctrl-C")?;
                break;
            }
            _ = ticker.tick() => log_status(&orchestrator.status()),
        }
    }

    info!("Stopping pipeline");
    orchestrator.stop().await?;
    log_status(&orchestrator.status());
    Ok(())
}

async fn generate(orchestrator: &Orchestrator, args: GenerateArgs) -> Result<ExitCode> {
    let warmup = Duration::from_secs(args.warmup_secs);
    if !warmup.is_zero() {
        orchestrator.start()?;
        info!(warmup_secs = args.warmup_secs, "Learning before generating");
        tokio::select! {
            signal = tokio::signal::ctrl_c() => signal.context("listening for Ctrl-C")?,
            () = tokio::time::sleep(warmup) => {}
        }
        log_status(&orchestrator.status());
    }

    let result = orchestrator.request_generation(&args.prompt, args.language).await;

    if orchestrator.is_running() {
        orchestrator.stop().await?;
    }

    match result {
        Ok(report) => {
            info!(validation_calls = report.validation_calls(), "Candidate passed validation");
            println!("{}", report.code);
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            eprintln!("error: {failure}");
            if let GenerationFailure::Exhausted { last_code, .. } = &failure {
                eprintln!("last candidate:\n{last_code}");
            }
            for diagnostic in failure.last_diagnostics() {
                eprintln!("  {diagnostic}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn log_status(status: &LearningStatus) {
    info!(
        processed = status.processed_count,
        learned = status.learned_count(),
        failed = status.failed_count,
        patterns = status.total_patterns(),
        languages = ?status.supported_languages,
        "Learning status"
    );
}
