//! pipeline-worker: runs the facility pipeline for one S3 notification.
//!
//! Reads the event JSON from `--event <path>` (or stdin), processes every
//! data file it names, and prints the handler response.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use aws_config::{BehaviorVersion, Region};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use facility_athena::AthenaClient;
use facility_core::config::{load_dotenv, load_dotenv_from};
use facility_core::Config;
use facility_pipeline::{FacilityPipeline, InvocationContext};
use facility_storage::S3Storage;

// ── CLI ─────────────────────────────────────────────────────────────

/// Facility pipeline worker: ensure table, aggregate, publish results.
#[derive(Parser, Debug)]
#[command(name = "pipeline-worker", version, about)]
struct Cli {
    /// S3 notification JSON file. Reads stdin when absent or `-`.
    #[arg(long)]
    event: Option<PathBuf>,

    /// Execution budget for this invocation; caps the query wait.
    #[arg(long, env = "PIPELINE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Env file to load instead of `.env`.
    #[arg(long)]
    env_file: Option<String>,
}

async fn read_event(path: Option<&PathBuf>) -> anyhow::Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => tokio::fs::read_to_string(p)
            .await
            .with_context(|| format!("reading event file {}", p.display())),
        _ => {
            let mut payload = String::new();
            tokio::io::stdin()
                .read_to_string(&mut payload)
                .await
                .context("reading event from stdin")?;
            Ok(payload)
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => load_dotenv_from(path).with_context(|| format!("loading {path}"))?,
        None => load_dotenv(),
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // The deadline starts before any setup work so it matches the host's clock.
    let ctx = match cli.timeout_secs {
        Some(secs) => InvocationContext::with_timeout(Duration::from_secs(secs)),
        None => InvocationContext::new(),
    };

    let config = Config::from_env();
    config.log_summary();

    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.aws.region.clone()));
    if let Some(endpoint) = &config.aws.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received, shutting down");
                shutdown.cancel();
            }
        });
    }

    let pipeline = FacilityPipeline::new(
        &config,
        Arc::new(AthenaClient::new(&sdk_config)),
        Arc::new(S3Storage::new(&sdk_config)),
    )
    .with_shutdown(shutdown);

    let payload = read_event(cli.event.as_ref()).await?;

    info!("pipeline-worker starting");
    let response = pipeline.handle_json(&payload, &ctx).await?;
    println!("{}", serde_json::to_string(&response)?);
    info!("pipeline-worker exited cleanly");

    Ok(())
}
