// ============================================================================
// Test Support
// ============================================================================
//
// Fixtures and in-memory doubles shared by the unit tests.
//
// ============================================================================

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use tokio_util::sync::CancellationToken;

use crate::db::{OrderRepository, StorageError, WriteStep};
use crate::domain::order::{Delivery, Item, Order, Payment};
use crate::messaging::{InboundMessage, MessageSource, MessagingError};

pub const ORDER_A1_JSON: &str = r#"{
  "order_uid": "A1",
  "track_number": "T1",
  "entry": "WBIL",
  "delivery": {
    "name": "Test Testov",
    "phone": "+79720000000",
    "zip": "2639809",
    "city": "Kiryat Mozkin",
    "address": "Ploshad Mira 15",
    "region": "Kraiot",
    "email": "test@gmail.com"
  },
  "payment": {
    "transaction": "TX1",
    "request_id": "",
    "currency": "USD",
    "provider": "wbpay",
    "amount": 1817,
    "payment_dt": 1637907727,
    "bank": "alpha",
    "delivery_cost": 1500,
    "goods_total": 317,
    "custom_fee": 0
  },
  "items": [
    {
      "chrt_id": 9934930,
      "track_number": "T1",
      "price": 453,
      "rid": "ab4219087a764ae0btest",
      "name": "Mascaras",
      "sale": 30,
      "size": "0",
      "total_price": 317,
      "nm_id": 2389212,
      "brand": "Vivienne Sabo",
      "status": 202
    },
    {
      "chrt_id": 9934931,
      "track_number": "T1",
      "price": 120,
      "rid": "ab4219087a764ae0btest2",
      "name": "Brush",
      "sale": 0,
      "size": "0",
      "total_price": 120,
      "nm_id": 2389213,
      "brand": "Vivienne Sabo",
      "status": 202
    }
  ],
  "locale": "en",
  "internal_signature": "",
  "customer_id": "test",
  "delivery_service": "meest",
  "shardkey": "9",
  "sm_id": 99,
  "date_created": "2021-11-26T06:22:19Z",
  "oof_shard": "1"
}"#;

/// An order that passes validation.
pub fn valid_order(order_uid: &str) -> Order {
    Order {
        order_uid: order_uid.to_string(),
        track_number: format!("TRACK-{}", order_uid),
        entry: "WBIL".to_string(),
        delivery: Delivery {
            name: "Test Testov".to_string(),
            phone: "+79720000000".to_string(),
            zip: "2639809".to_string(),
            city: "Kiryat Mozkin".to_string(),
            address: "Ploshad Mira 15".to_string(),
            region: "Kraiot".to_string(),
            email: "test@gmail.com".to_string(),
        },
        payment: Payment {
            transaction: format!("TX-{}", order_uid),
            currency: "USD".to_string(),
            provider: "wbpay".to_string(),
            amount: 1817,
            payment_dt: 1637907727,
            bank: "alpha".to_string(),
            delivery_cost: 1500,
            goods_total: 317,
            ..Payment::default()
        },
        items: vec![Item {
            track_number: format!("TRACK-{}", order_uid),
            price: 453,
            rid: "ab4219087a764ae0btest".to_string(),
            name: "Mascaras".to_string(),
            sale: 30,
            size: "0".to_string(),
            total_price: 317,
            nm_id: 2389212,
            brand: "Vivienne Sabo".to_string(),
            status: 202,
        }],
        locale: "en".to_string(),
        customer_id: "test".to_string(),
        delivery_service: "meest".to_string(),
        shardkey: "9".to_string(),
        sm_id: 99,
        date_created: Utc.with_ymd_and_hms(2021, 11, 26, 6, 22, 19).unwrap(),
        oof_shard: "1".to_string(),
        ..Order::default()
    }
}

/// A valid order created `offset` seconds after the fixture date.
pub fn order_created_at(order_uid: &str, offset: i64) -> Order {
    let mut order = valid_order(order_uid);
    order.date_created += Duration::seconds(offset);
    order
}

// ============================================================================
// In-memory repository
// ============================================================================

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<HashMap<String, Order>>,
    written: Mutex<Vec<String>>,
    fail_reads: Mutex<bool>,
    fail_writes_at: Mutex<Option<WriteStep>>,
    read_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an order directly, bypassing `write_order` bookkeeping.
    pub fn seed(&self, order: Order) {
        self.orders.lock().unwrap().insert(order.order_uid.clone(), order);
    }

    pub fn fail_reads(&self, fail: bool) {
        *self.fail_reads.lock().unwrap() = fail;
    }

    pub fn fail_writes_at(&self, step: Option<WriteStep>) {
        *self.fail_writes_at.lock().unwrap() = step;
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Uids committed through `write_order`, in commit order.
    pub fn write_order_uids(&self) -> Vec<String> {
        self.written.lock().unwrap().clone()
    }

    pub fn stored(&self, order_uid: &str) -> Option<Order> {
        self.orders.lock().unwrap().get(order_uid).cloned()
    }

    pub fn contains(&self, order_uid: &str) -> bool {
        self.orders.lock().unwrap().contains_key(order_uid)
    }

    fn check_reads(&self, what: &'static str) -> Result<(), StorageError> {
        if *self.fail_reads.lock().unwrap() {
            return Err(StorageError::Read {
                what,
                source: sqlx::Error::Protocol("storage offline".into()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn write_order(&self, order: &Order) -> Result<(), StorageError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);

        let mut orders = self.orders.lock().unwrap();
        if orders.contains_key(&order.order_uid) {
            return Err(StorageError::DuplicateOrder(order.order_uid.clone()));
        }

        // Stage first, then discard the staged order if a step fails.
        orders.insert(order.order_uid.clone(), order.clone());

        if let Some(step) = *self.fail_writes_at.lock().unwrap() {
            orders.remove(&order.order_uid);
            return Err(StorageError::Write {
                step,
                source: sqlx::Error::Protocol(format!("injected failure at {}", step)),
            });
        }

        self.written.lock().unwrap().push(order.order_uid.clone());
        Ok(())
    }

    async fn read_order(&self, order_uid: &str) -> Result<Order, StorageError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads("order")?;

        self.stored(order_uid)
            .ok_or_else(|| StorageError::NotFound(order_uid.to_string()))
    }

    async fn read_recent_orders(&self, limit: i64) -> Result<Vec<Order>, StorageError> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reads("recent orders")?;

        let mut orders: Vec<Order> = self.orders.lock().unwrap().values().cloned().collect();
        orders.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        orders.truncate(limit.max(0) as usize);
        Ok(orders)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check_reads("ping")
    }
}

// ============================================================================
// Scripted message source
// ============================================================================

/// Replays a fixed script, then cancels `done` and waits forever.
///
/// `Err(())` entries surface as receive errors.
pub struct ScriptedSource {
    script: VecDeque<Result<Vec<u8>, ()>>,
    next_offset: i64,
    done: CancellationToken,
    acknowledged: Arc<Mutex<Vec<i64>>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Vec<u8>, ()>>, done: CancellationToken) -> Self {
        Self {
            script: script.into(),
            next_offset: 0,
            done,
            acknowledged: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn acknowledged(&self) -> Arc<Mutex<Vec<i64>>> {
        self.acknowledged.clone()
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    async fn next_message(&mut self) -> Result<InboundMessage, MessagingError> {
        match self.script.pop_front() {
            Some(Ok(payload)) => {
                let offset = self.next_offset;
                self.next_offset += 1;
                Ok(InboundMessage {
                    topic: "orders".to_string(),
                    partition: 0,
                    offset,
                    payload,
                })
            }
            Some(Err(())) => Err(MessagingError::Receive(KafkaError::MessageConsumption(
                RDKafkaErrorCode::BrokerTransportFailure,
            ))),
            None => {
                self.done.cancel();
                std::future::pending().await
            }
        }
    }

    async fn acknowledge(&mut self, message: &InboundMessage) -> Result<(), MessagingError> {
        self.acknowledged.lock().unwrap().push(message.offset);
        Ok(())
    }
}
