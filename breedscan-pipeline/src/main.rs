//! breedscan - pet image classification CLI
//!
//! Runs one image through the pipeline and prints the result (or the
//! rejection) as JSON on stdout. Logs go to stderr.
//!
//! Exit codes: 0 success, 1 setup failure, 2 image rejected, 3 a service
//! was unavailable (retrying may succeed).

use anyhow::{Context, Result};
use breedscan_common::config::{load_config, log_config_summary};
use breedscan_common::logging;
use breedscan_pipeline::{build_orchestrator, Rejection};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "breedscan", version, about = "Classify a pet photo")]
struct Args {
    /// Image file to analyse
    image: PathBuf,

    /// Configuration file (overrides BREEDSCAN_CONFIG and default locations)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Classifier sub-service base URL
    #[arg(long)]
    classifier_url: Option<String>,

    /// Knowledge store base URL
    #[arg(long)]
    knowledge_url: Option<String>,

    /// Vision-language service base URL
    #[arg(long)]
    vision_url: Option<String>,

    /// Run the safety and species checks concurrently
    #[arg(long)]
    concurrent_screening: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("breedscan: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let (mut config, source) =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;

    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(url) = args.classifier_url {
        config.services.classifier_url = url;
    }
    if let Some(url) = args.knowledge_url {
        config.services.knowledge_url = url;
    }
    if let Some(url) = args.vision_url {
        config.services.vision_url = url;
    }
    if args.concurrent_screening {
        config.pipeline.concurrent_screening = Some(true);
    }

    logging::init(&config.logging).context("Failed to initialise logging")?;

    info!("Starting breedscan v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Build: {} ({}) [{}]",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    log_config_summary(&source);

    let orchestrator = build_orchestrator(&config)?;

    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling analysis");
            ctrl_c_token.cancel();
        }
    });

    let outcome = orchestrator.analyze_with_cancellation(bytes, &token).await;

    match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(rejection) => {
            println!("{}", serde_json::to_string_pretty(&rejection.to_json())?);
            Ok(exit_code_for(&rejection))
        }
    }
}

fn exit_code_for(rejection: &Rejection) -> ExitCode {
    if rejection.is_retryable() {
        ExitCode::from(3)
    } else {
        ExitCode::from(2)
    }
}
