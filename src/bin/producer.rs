//! Publishes JSON order files to the orders topic, one message per file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_ingest::messaging::OrderPublisher;

#[derive(Parser)]
#[command(name = "producer")]
#[command(about = "Publish order fixtures to the orders topic.")]
struct CommandLine {
    /// Kafka/Redpanda bootstrap servers
    #[arg(long, default_value = "127.0.0.1:9092")]
    brokers: String,

    #[arg(long, default_value = "orders")]
    topic: String,

    /// Pause between two files
    #[arg(long, default_value_t = 5)]
    interval_secs: u64,

    /// JSON files to publish, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = CommandLine::parse();
    let publisher = OrderPublisher::new(&cli.brokers, &cli.topic)?;

    for (i, path) in cli.files.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_secs(cli.interval_secs)).await;
        }

        let payload = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let key = order_uid(&payload);

        publisher
            .publish(key.as_deref(), &payload)
            .await
            .with_context(|| format!("failed to publish {}", path.display()))?;

        tracing::info!(file = %path.display(), "Sent order {}", i);
    }

    Ok(())
}

/// Message key: the `order_uid` of the payload, when it has one.
fn order_uid(payload: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
    value
        .get("order_uid")?
        .as_str()
        .filter(|uid| !uid.is_empty())
        .map(str::to_string)
}
