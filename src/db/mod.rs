// ============================================================================
// Storage Gateway
// ============================================================================
//
// Durable order storage. An order is spread over five tables (payments,
// clients, orders, items, order_to_items) linked by generated ids; callers
// only ever see the whole aggregate.
//
// ============================================================================

mod errors;
mod postgres;

use async_trait::async_trait;

use crate::domain::order::Order;

pub use errors::{StorageError, WriteStep};
pub use postgres::PgOrderRepository;

/// Number of most recent orders loaded into the cache at startup.
pub const WARMUP_LIMIT: i64 = 100;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist the whole aggregate in one transaction, or nothing.
    async fn write_order(&self, order: &Order) -> Result<(), StorageError>;

    /// Load one aggregate; `StorageError::NotFound` when the uid is unknown.
    async fn read_order(&self, order_uid: &str) -> Result<Order, StorageError>;

    /// Up to `limit` aggregates, most recently created first.
    async fn read_recent_orders(&self, limit: i64) -> Result<Vec<Order>, StorageError>;

    async fn ping(&self) -> Result<(), StorageError>;
}
