use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

use crate::services::IngestOutcome;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// - Ingestion throughput, latency and drop reasons
// - Cache hits/misses and cache size
// - Storage errors by operation
//
// Scraped via GET /metrics.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Ingestion
    pub orders_received: IntCounter,
    pub orders_ingested: IntCounter,
    pub orders_dropped: IntCounterVec,
    pub ingest_duration: Histogram,

    // Read path
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub cache_entries: IntGauge,

    // Storage
    pub storage_errors: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_received = IntCounter::new(
            "orders_received_total",
            "Messages taken off the orders topic",
        )?;
        registry.register(Box::new(orders_received.clone()))?;

        let orders_ingested = IntCounter::new(
            "orders_ingested_total",
            "Orders persisted and cached",
        )?;
        registry.register(Box::new(orders_ingested.clone()))?;

        let orders_dropped = IntCounterVec::new(
            Opts::new("orders_dropped_total", "Messages dropped by the ingestion loop"),
            &["reason"],
        )?;
        registry.register(Box::new(orders_dropped.clone()))?;

        let ingest_duration = Histogram::with_opts(
            HistogramOpts::new("order_ingest_duration_seconds", "Time to process one message")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(ingest_duration.clone()))?;

        let cache_hits = IntCounter::new("order_cache_hits_total", "Lookups served from cache")?;
        registry.register(Box::new(cache_hits.clone()))?;

        let cache_misses = IntCounter::new(
            "order_cache_misses_total",
            "Lookups that fell through to storage",
        )?;
        registry.register(Box::new(cache_misses.clone()))?;

        let cache_entries = IntGauge::new("order_cache_entries", "Orders held in the cache")?;
        registry.register(Box::new(cache_entries.clone()))?;

        let storage_errors = IntCounterVec::new(
            Opts::new("storage_errors_total", "Storage gateway failures"),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(storage_errors.clone()))?;

        Ok(Self {
            registry,
            orders_received,
            orders_ingested,
            orders_dropped,
            ingest_duration,
            cache_hits,
            cache_misses,
            cache_entries,
            storage_errors,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_ingest(&self, outcome: IngestOutcome, duration_secs: f64) {
        self.orders_received.inc();
        match outcome.drop_reason() {
            Some(reason) => self.orders_dropped.with_label_values(&[reason]).inc(),
            None => self.orders_ingested.inc(),
        }
        self.ingest_duration.observe(duration_secs);
    }

    pub fn record_storage_error(&self, operation: &str, kind: &str) {
        self.storage_errors.with_label_values(&[operation, kind]).inc();
    }

    pub fn dropped(&self, reason: &str) -> u64 {
        self.orders_dropped.with_label_values(&[reason]).get()
    }
}
