//! Quote clip worker binary.
//!
//! Reads one event JSON from the file given as the first argument, or from
//! stdin, and prints the response JSON to stdout.

use anyhow::Context;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

use qclip_worker::{handle_event, init_tracing, response_json, JobProcessor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting qclip-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    match run(config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Worker error: {:#}", e);
            println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
            std::process::exit(1);
        }
    }
}

/// Returns whether the job succeeded.
async fn run(config: WorkerConfig) -> anyhow::Result<bool> {
    let event = read_event().await?;
    let processor = JobProcessor::new(&config).context("Failed to create job processor")?;

    let outcome = handle_event(&processor, event).await;
    match &outcome {
        Ok(result) => info!("Job finished with {} clip(s)", result.count),
        Err(failure) => error!("Job failed: {}", failure.error),
    }

    println!("{}", serde_json::to_string(&response_json(&outcome))?);
    Ok(outcome.is_ok())
}

async fn read_event() -> anyhow::Result<Value> {
    let raw = match std::env::args().nth(1) {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read event file {}", path))?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Failed to read event from stdin")?;
            buf
        }
    };

    serde_json::from_str(&raw).context("Event is not valid JSON")
}
