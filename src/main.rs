use std::sync::Arc;

use kameo::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_ingest::actors::{component, HealthMonitorActor, HealthStatus, MarkReady, UpdateHealth};
use order_ingest::api::{self, AppState};
use order_ingest::cache::OrderCache;
use order_ingest::config::Config;
use order_ingest::db::{OrderRepository, PgOrderRepository};
use order_ingest::messaging::KafkaOrderSource;
use order_ingest::metrics::Metrics;
use order_ingest::services::{OrderIngestor, OrderService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Default to INFO, override with RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_ingest=debug")),
        )
        .init();

    tracing::info!("🚀 Starting order ingestion service");

    let config = Config::from_env()?;

    // === 1. Storage ===
    tracing::info!("Connecting to Postgres...");
    let pg = PgOrderRepository::connect(
        &config.database_url,
        config.database_max_connections,
        config.database_acquire_timeout,
    )
    .await?;

    if config.run_migrations {
        pg.run_migrations().await?;
        tracing::info!("Schema migrations applied");
    }

    let repository: Arc<dyn OrderRepository> = Arc::new(pg);

    // === 2. Metrics, cache, health ===
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    let cache = Arc::new(OrderCache::new());
    let health = HealthMonitorActor::spawn(HealthMonitorActor::new(repository.clone()));

    // === 3. Warm-up, before the listener binds ===
    let orders = Arc::new(
        OrderService::new(repository.clone(), cache.clone()).with_metrics(metrics.clone()),
    );

    let warmup = match orders.warm_up().await {
        Ok(0) => UpdateHealth::new(
            component::CACHE_WARMUP,
            HealthStatus::Degraded("no orders loaded".to_string()),
        ),
        Ok(cached) => UpdateHealth::new(component::CACHE_WARMUP, HealthStatus::Healthy)
            .with_details(format!("{} orders cached", cached)),
        Err(e) => UpdateHealth::new(component::CACHE_WARMUP, HealthStatus::Degraded(e.to_string()))
            .with_details("starting with an empty cache"),
    };
    health
        .tell(warmup)
        .await
        .map_err(|e| anyhow::anyhow!("health monitor unavailable: {}", e))?;
    health
        .tell(MarkReady)
        .await
        .map_err(|e| anyhow::anyhow!("health monitor unavailable: {}", e))?;

    // === 4. Ingestion ===
    let shutdown = CancellationToken::new();

    let source = KafkaOrderSource::new(
        &config.kafka_brokers,
        &config.kafka_group_id,
        &config.orders_topic,
    )?;
    let ingestor = OrderIngestor::new(repository.clone(), cache.clone())
        .with_metrics(metrics.clone())
        .with_health(health.clone())
        .with_error_backoff(config.receive_error_backoff);

    let ingestion = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { ingestor.run(source, shutdown).await }
    });

    // === 5. HTTP ===
    let state = AppState {
        orders,
        health: health.clone(),
        metrics,
    };
    let server = api::start_server(state, &config.host, config.port)?;
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    wait_for_signal().await;
    tracing::info!("Shutdown requested");

    shutdown.cancel();
    server_handle.stop(true).await;

    if let Err(e) = ingestion.await {
        tracing::error!(error = %e, "Ingestion task panicked");
    }
    match server_task.await {
        Ok(Err(e)) => tracing::error!(error = %e, "HTTP server error"),
        Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
        Ok(Ok(())) => {}
    }

    tracing::info!("👋 Stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
