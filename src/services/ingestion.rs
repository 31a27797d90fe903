use std::sync::Arc;
use std::time::{Duration, Instant};

use kameo::actor::ActorRef;
use tokio_util::sync::CancellationToken;

use crate::actors::{component, HealthMonitorActor, HealthStatus, UpdateHealth};
use crate::cache::OrderCache;
use crate::db::{OrderRepository, StorageError};
use crate::domain::order::{validate_order, Order};
use crate::messaging::{MessageSource, MessagingError};
use crate::metrics::Metrics;

// ============================================================================
// Order Ingestion Loop
// ============================================================================
//
// Per message:
//   Received -> Decoded -> Validated -> Persisted -> Cached
//                  |           |            |
//                  +-----------+------------+--> Dropped
//
// Messages are handled one at a time in receipt order. The cache is only
// touched after the storage write committed. Every failure is logged and the
// loop moves on; nothing here is fatal and nothing is retried.
//
// ============================================================================

/// Where a message left the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Cached,
    DroppedMalformed,
    DroppedInvalid,
    DroppedPersistFailed,
}

impl IngestOutcome {
    pub fn drop_reason(&self) -> Option<&'static str> {
        match self {
            IngestOutcome::Cached => None,
            IngestOutcome::DroppedMalformed => Some("malformed"),
            IngestOutcome::DroppedInvalid => Some("invalid"),
            IngestOutcome::DroppedPersistFailed => Some("persist_failed"),
        }
    }
}

pub struct OrderIngestor {
    repository: Arc<dyn OrderRepository>,
    cache: Arc<OrderCache>,
    metrics: Option<Arc<Metrics>>,
    health: Option<ActorRef<HealthMonitorActor>>,
    error_backoff: Duration,
}

impl OrderIngestor {
    pub fn new(repository: Arc<dyn OrderRepository>, cache: Arc<OrderCache>) -> Self {
        Self {
            repository,
            cache,
            metrics: None,
            health: None,
            error_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_health(mut self, health: ActorRef<HealthMonitorActor>) -> Self {
        self.health = Some(health);
        self
    }

    /// Pause after a failed receive before asking the bus again.
    pub fn with_error_backoff(mut self, error_backoff: Duration) -> Self {
        self.error_backoff = error_backoff;
        self
    }

    /// Consume `source` until `shutdown` fires.
    ///
    /// Cancellation only interrupts the wait for the next message; a message
    /// already received is processed and acknowledged before the loop exits.
    pub async fn run<S: MessageSource>(&self, mut source: S, shutdown: CancellationToken) {
        tracing::info!("🔄 Order ingestion started");
        self.report(component::INGESTION, HealthStatus::Healthy).await;

        // Last bus state pushed to the health monitor.
        let mut bus_healthy: Option<bool> = None;

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = source.next_message() => received,
            };

            let message = match received {
                Ok(message) => message,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive message from bus");
                    if bus_healthy != Some(false) {
                        bus_healthy = Some(false);
                        self.report(component::MESSAGE_BUS, HealthStatus::Unhealthy(e.to_string()))
                            .await;
                    }
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.error_backoff) => continue,
                    }
                }
            };

            if bus_healthy != Some(true) {
                bus_healthy = Some(true);
                self.report(component::MESSAGE_BUS, HealthStatus::Healthy).await;
            }

            let outcome = self.process_message(&message.payload).await;

            tracing::debug!(
                partition = message.partition,
                offset = message.offset,
                outcome = ?outcome,
                "Message handled"
            );

            if let Err(e) = source.acknowledge(&message).await {
                log_ack_failure(&e, message.offset);
            }
        }

        self.report(component::INGESTION, HealthStatus::Unhealthy("stopped".to_string()))
            .await;
        tracing::info!("Order ingestion stopped");
    }

    /// Run one payload through decode, validate, persist and cache.
    pub async fn process_message(&self, payload: &[u8]) -> IngestOutcome {
        let started = Instant::now();
        let outcome = self.ingest(payload).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_ingest(outcome, started.elapsed().as_secs_f64());
            metrics.cache_entries.set(self.cache.len() as i64);
        }

        outcome
    }

    async fn ingest(&self, payload: &[u8]) -> IngestOutcome {
        let mut order: Order = match serde_json::from_slice(payload) {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(error = %e, bytes = payload.len(), "Dropping undecodable message");
                return IngestOutcome::DroppedMalformed;
            }
        };

        if let Err(reason) = validate_order(&mut order) {
            tracing::warn!(
                order_uid = %order.order_uid,
                reason = %reason,
                "Dropping order that failed validation"
            );
            return IngestOutcome::DroppedInvalid;
        }

        if let Err(e) = self.repository.write_order(&order).await {
            match &e {
                StorageError::DuplicateOrder(_) => {
                    tracing::warn!(order_uid = %order.order_uid, "Order already stored, dropping redelivery");
                }
                _ => {
                    tracing::error!(order_uid = %order.order_uid, error = %e, "Failed to persist order");
                }
            }
            if let Some(metrics) = &self.metrics {
                metrics.record_storage_error("write_order", e.kind());
            }
            return IngestOutcome::DroppedPersistFailed;
        }

        let order_uid = order.order_uid.clone();
        self.cache.insert(order);

        tracing::info!(order_uid = %order_uid, "✅ Order ingested");
        IngestOutcome::Cached
    }

    async fn report(&self, component: &str, status: HealthStatus) {
        if let Some(health) = &self.health {
            if let Err(e) = health.tell(UpdateHealth::new(component, status)).await {
                tracing::debug!(error = %e, "Health monitor unavailable");
            }
        }
    }
}

fn log_ack_failure(error: &MessagingError, offset: i64) {
    tracing::warn!(error = %error, offset = offset, "Failed to acknowledge message, it may be redelivered");
}

// ============================================================================
// Unit Tests
// ============================================================================
