use std::sync::Arc;

use crate::cache::OrderCache;
use crate::db::{OrderRepository, StorageError, WARMUP_LIMIT};
use crate::domain::order::Order;
use crate::metrics::Metrics;

// ============================================================================
// Order Query Service
// ============================================================================
//
// Read path used by the HTTP layer:
//   cache hit  -> return cached order
//   cache miss -> read from storage, do NOT insert into the cache
//
// A miss is never written back, so repeated lookups of an order that is only
// in storage pay a storage read every time.
//
// ============================================================================

pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    cache: Arc<OrderCache>,
    metrics: Option<Arc<Metrics>>,
}

impl OrderService {
    pub fn new(repository: Arc<dyn OrderRepository>, cache: Arc<OrderCache>) -> Self {
        Self {
            repository,
            cache,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn cache(&self) -> &Arc<OrderCache> {
        &self.cache
    }

    /// Load the most recent orders into the cache.
    ///
    /// Returns how many orders the cache holds afterwards. On failure the
    /// error is logged and returned; the caller keeps going with whatever the
    /// cache already contains.
    pub async fn warm_up(&self) -> Result<usize, StorageError> {
        let orders = match self.repository.read_recent_orders(WARMUP_LIMIT).await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!(error = %e, "Cache warm-up failed, starting with an empty cache");
                self.record_storage_error("read_recent_orders", &e);
                return Err(e);
            }
        };

        let loaded = orders.len();
        for order in orders {
            self.cache.insert(order);
        }

        if let Some(metrics) = &self.metrics {
            metrics.cache_entries.set(self.cache.len() as i64);
        }

        tracing::info!(loaded = loaded, "✅ Cache warmed up from Postgres");
        Ok(self.cache.len())
    }

    /// Cache first, storage second. `Ok(None)` when the order does not exist.
    pub async fn get_order(&self, order_uid: &str) -> Result<Option<Arc<Order>>, StorageError> {
        if let Some(order) = self.cache.get(order_uid) {
            if let Some(metrics) = &self.metrics {
                metrics.cache_hits.inc();
            }
            return Ok(Some(order));
        }

        if let Some(metrics) = &self.metrics {
            metrics.cache_misses.inc();
        }

        match self.repository.read_order(order_uid).await {
            Ok(order) => Ok(Some(Arc::new(order))),
            Err(StorageError::NotFound(_)) => {
                tracing::debug!(order_uid = %order_uid, "Order not found");
                Ok(None)
            }
            Err(e) => {
                tracing::error!(order_uid = %order_uid, error = %e, "Order lookup failed");
                self.record_storage_error("read_order", &e);
                Err(e)
            }
        }
    }

    fn record_storage_error(&self, operation: &str, error: &StorageError) {
        if let Some(metrics) = &self.metrics {
            metrics.record_storage_error(operation, error.kind());
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
