use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use super::errors::{is_unique_violation, StorageError, WriteStep};
use super::OrderRepository;
use crate::domain::order::{Delivery, Item, Order, Payment};

// ============================================================================
// Postgres Order Repository
// ============================================================================
//
// Write path: one REPEATABLE READ transaction per order.
//   payments -> clients -> orders -> (items -> order_to_items)*
// Each insert returns the generated id the next one references. Any failing
// step rolls the transaction back.
//
// Read path: order row, then delivery and payment by id, then item ids from
// the association table, then each item row.
//
// ============================================================================

const ORDER_COLUMNS: &str = "id, order_uid, track_number, entry, delivery, payment, locale, \
     internal_signature, customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard";

#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    order_uid: String,
    track_number: String,
    entry: String,
    delivery: i64,
    payment: i64,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i64,
    date_created: DateTime<Utc>,
    oof_shard: String,
}

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a pool with bounded size and acquire timeout.
    /// The URL may carry credentials and is never logged.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::from_str(url)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn assemble(&self, row: OrderRow) -> Result<Order, StorageError> {
        let delivery: Delivery = sqlx::query_as(
            "SELECT full_name AS name, phone, zip, city, address, region, email
             FROM clients WHERE id = $1",
        )
        .bind(row.delivery)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::read("delivery"))?;

        let payment: Payment = sqlx::query_as(
            "SELECT transaction, request_id, currency, provider, amount, payment_dt,
                    bank, delivery_cost, goods_total, custom_fee
             FROM payments WHERE id = $1",
        )
        .bind(row.payment)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::read("payment"))?;

        // Item ids are generated in insertion order, which is item position.
        let item_ids: Vec<i64> = sqlx::query_scalar(
            "SELECT item_id FROM order_to_items WHERE order_id = $1 ORDER BY item_id",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::read("item ids"))?;

        let items = try_join_all(item_ids.into_iter().map(|item_id| self.read_item(item_id))).await?;

        Ok(Order {
            order_uid: row.order_uid,
            track_number: row.track_number,
            entry: row.entry,
            delivery,
            payment,
            items,
            locale: row.locale,
            internal_signature: row.internal_signature,
            customer_id: row.customer_id,
            delivery_service: row.delivery_service,
            shardkey: row.shardkey,
            sm_id: row.sm_id,
            date_created: row.date_created,
            oof_shard: row.oof_shard,
        })
    }

    async fn read_item(&self, item_id: i64) -> Result<Item, StorageError> {
        sqlx::query_as(
            "SELECT track_number, price, rid, name, sale, size, total_price, nm_id, brand, status
             FROM items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::read("item"))
    }
}

fn at(step: WriteStep) -> impl FnOnce(sqlx::Error) -> (WriteStep, sqlx::Error) {
    move |source| (step, source)
}

/// Every insert of one order, in dependency order. Stops at the first failure.
async fn insert_aggregate(
    tx: &mut Transaction<'_, Postgres>,
    order: &Order,
) -> Result<(), (WriteStep, sqlx::Error)> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(&mut **tx)
        .await
        .map_err(at(WriteStep::SetIsolation))?;

    let payment = &order.payment;
    let payment_id: i64 = sqlx::query_scalar(
        "INSERT INTO payments (transaction, request_id, currency, provider, amount, payment_dt,
                               bank, delivery_cost, goods_total, custom_fee)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
    )
    .bind(&payment.transaction)
    .bind(&payment.request_id)
    .bind(&payment.currency)
    .bind(&payment.provider)
    .bind(payment.amount)
    .bind(payment.payment_dt)
    .bind(&payment.bank)
    .bind(payment.delivery_cost)
    .bind(payment.goods_total)
    .bind(payment.custom_fee)
    .fetch_one(&mut **tx)
    .await
    .map_err(at(WriteStep::InsertPayment))?;

    let delivery = &order.delivery;
    let client_id: i64 = sqlx::query_scalar(
        "INSERT INTO clients (full_name, phone, zip, city, address, region, email)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
    )
    .bind(&delivery.name)
    .bind(&delivery.phone)
    .bind(&delivery.zip)
    .bind(&delivery.city)
    .bind(&delivery.address)
    .bind(&delivery.region)
    .bind(&delivery.email)
    .fetch_one(&mut **tx)
    .await
    .map_err(at(WriteStep::InsertDelivery))?;

    let order_id: i64 = sqlx::query_scalar(
        "INSERT INTO orders (order_uid, track_number, entry, delivery, payment, locale,
                             internal_signature, customer_id, delivery_service, shardkey,
                             sm_id, date_created, oof_shard)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING id",
    )
    .bind(&order.order_uid)
    .bind(&order.track_number)
    .bind(&order.entry)
    .bind(client_id)
    .bind(payment_id)
    .bind(&order.locale)
    .bind(&order.internal_signature)
    .bind(&order.customer_id)
    .bind(&order.delivery_service)
    .bind(&order.shardkey)
    .bind(order.sm_id)
    .bind(order.date_created)
    .bind(&order.oof_shard)
    .fetch_one(&mut **tx)
    .await
    .map_err(at(WriteStep::InsertOrder))?;

    for (index, item) in order.items.iter().enumerate() {
        let item_id: i64 = sqlx::query_scalar(
            "INSERT INTO items (track_number, price, rid, name, sale, size, total_price,
                                nm_id, brand, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(&item.track_number)
        .bind(item.price)
        .bind(&item.rid)
        .bind(&item.name)
        .bind(item.sale)
        .bind(&item.size)
        .bind(item.total_price)
        .bind(item.nm_id)
        .bind(&item.brand)
        .bind(item.status)
        .fetch_one(&mut **tx)
        .await
        .map_err(at(WriteStep::InsertItem(index)))?;

        sqlx::query("INSERT INTO order_to_items (order_id, item_id) VALUES ($1, $2)")
            .bind(order_id)
            .bind(item_id)
            .execute(&mut **tx)
            .await
            .map_err(at(WriteStep::LinkItem(index)))?;
    }

    Ok(())
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn write_order(&self, order: &Order) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(|source| StorageError::Write {
            step: WriteStep::Begin,
            source,
        })?;

        if let Err((step, source)) = insert_aggregate(&mut tx, order).await {
            if let Err(rollback) = tx.rollback().await {
                tracing::error!(
                    order_uid = %order.order_uid,
                    step = %step,
                    error = %rollback,
                    "Rollback of failed order write also failed"
                );
                return Err(StorageError::RollbackFailed { step, source, rollback });
            }

            if step == WriteStep::InsertOrder && is_unique_violation(&source) {
                return Err(StorageError::DuplicateOrder(order.order_uid.clone()));
            }

            return Err(StorageError::Write { step, source });
        }

        // A failed COMMIT leaves nothing behind: the server aborts the
        // transaction and sqlx discards it.
        tx.commit().await.map_err(|source| StorageError::Write {
            step: WriteStep::Commit,
            source,
        })?;

        tracing::debug!(
            order_uid = %order.order_uid,
            item_count = order.items.len(),
            "Order written to Postgres"
        );

        Ok(())
    }

    async fn read_order(&self, order_uid: &str) -> Result<Order, StorageError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_uid = $1");
        let row: Option<OrderRow> = sqlx::query_as(&query)
            .bind(order_uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::read("order"))?;

        match row {
            Some(row) => self.assemble(row).await,
            None => Err(StorageError::NotFound(order_uid.to_string())),
        }
    }

    async fn read_recent_orders(&self, limit: i64) -> Result<Vec<Order>, StorageError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY date_created DESC LIMIT $1"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::read("recent orders"))?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.assemble(row).await?);
        }

        Ok(orders)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StorageError::read("ping"))?;
        Ok(())
    }
}

// Database behaviour (atomic rollback, unique order_uid, round-trip) is
// covered by tests/postgres_repository.rs against a live server.
