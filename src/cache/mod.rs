use std::sync::Arc;

use dashmap::DashMap;

use crate::domain::order::Order;

// ============================================================================
// Order Cache
// ============================================================================
//
// In-memory `order_uid -> Order` map shared by the ingestion task (writer) and
// request handlers (readers). Entries are only inserted after the order is
// durable. No eviction and no size bound.
//
// ============================================================================

#[derive(Debug, Default)]
pub struct OrderCache {
    orders: DashMap<String, Arc<Order>>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, order_uid: &str) -> Option<Arc<Order>> {
        self.orders.get(order_uid).map(|entry| Arc::clone(entry.value()))
    }

    /// Insert or replace the entry for the order's uid.
    pub fn insert(&self, order: Order) {
        self.orders.insert(order.order_uid.clone(), Arc::new(order));
    }

    pub fn contains(&self, order_uid: &str) -> bool {
        self.orders.contains_key(order_uid)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
