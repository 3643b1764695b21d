//! PostgreSQL order store
//!
//! Four tables keyed by `order_uid`: `orders`, `delivery`, `payments` and `items`
//! (items keep their position within the order). Each order is written in its own
//! transaction; the `orders` insert uses `ON CONFLICT DO NOTHING` so a redelivered
//! order is detected and its child rows are not written twice.

use super::errors::{RepositoryError, RepositoryResult};
use super::traits::{InsertOutcome, OrderStore};
use crate::models::{Delivery, Item, Order, Payment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

const ORDER_COLUMNS: &str = "order_uid, track_number, entry, locale, internal_signature, \
     customer_id, delivery_service, shardkey, sm_id, date_created, oof_shard";

/// Maps to `orders` table
#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    order_uid: String,
    track_number: String,
    entry: String,
    locale: String,
    internal_signature: String,
    customer_id: String,
    delivery_service: String,
    shardkey: String,
    sm_id: i32,
    date_created: DateTime<Utc>,
    oof_shard: String,
}

/// Maps to `delivery` table
#[derive(Debug, Clone, FromRow)]
struct DeliveryRow {
    order_uid: String,
    name: String,
    phone: String,
    zip: String,
    city: String,
    address: String,
    region: String,
    email: String,
}

/// Maps to `payments` table
#[derive(Debug, Clone, FromRow)]
struct PaymentRow {
    order_uid: String,
    transaction: String,
    request_id: String,
    currency: String,
    provider: String,
    amount: i32,
    payment_dt: i64,
    bank: String,
    delivery_cost: i32,
    goods_total: i32,
    custom_fee: i32,
}

/// Maps to `items` table
#[derive(Debug, Clone, FromRow)]
struct ItemRow {
    order_uid: String,
    chrt_id: i64,
    track_number: String,
    price: i32,
    rid: String,
    name: String,
    sale: i32,
    size: String,
    total_price: i32,
    nm_id: i64,
    brand: String,
    status: i32,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Delivery {
            name: row.name,
            phone: row.phone,
            zip: row.zip,
            city: row.city,
            address: row.address,
            region: row.region,
            email: row.email,
        }
    }
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            transaction: row.transaction,
            request_id: row.request_id,
            currency: row.currency,
            provider: row.provider,
            amount: row.amount,
            payment_dt: row.payment_dt,
            bank: row.bank,
            delivery_cost: row.delivery_cost,
            goods_total: row.goods_total,
            custom_fee: row.custom_fee,
        }
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            chrt_id: row.chrt_id,
            track_number: row.track_number,
            price: row.price,
            rid: row.rid,
            name: row.name,
            sale: row.sale,
            size: row.size,
            total_price: row.total_price,
            nm_id: row.nm_id,
            brand: row.brand,
            status: row.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_children(
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<(), sqlx::Error> {
        let delivery = &order.delivery;
        sqlx::query(
            r#"
            INSERT INTO delivery (order_uid, name, phone, zip, city, address, region, email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&delivery.name)
        .bind(&delivery.phone)
        .bind(&delivery.zip)
        .bind(&delivery.city)
        .bind(&delivery.address)
        .bind(&delivery.region)
        .bind(&delivery.email)
        .execute(&mut **tx)
        .await?;

        let payment = &order.payment;
        sqlx::query(
            r#"
            INSERT INTO payments (order_uid, transaction, request_id, currency, provider, amount,
                                  payment_dt, bank, delivery_cost, goods_total, custom_fee)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&order.order_uid)
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
        .execute(&mut **tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO items (order_uid, position, chrt_id, track_number, price, rid, name,
                                   sale, size, total_price, nm_id, brand, status)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                "#,
            )
            .bind(&order.order_uid)
            .bind(position as i32)
            .bind(item.chrt_id)
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
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    /// Load child rows for the given order rows and build aggregates, keeping row order
    async fn assemble(&self, rows: Vec<OrderRow>) -> RepositoryResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let uids: Vec<String> = rows.iter().map(|r| r.order_uid.clone()).collect();

        let deliveries: Vec<DeliveryRow> = sqlx::query_as(
            r#"
            SELECT order_uid, name, phone, zip, city, address, region, email
            FROM delivery
            WHERE order_uid = ANY($1)
            "#,
        )
        .bind(&uids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::database("load deliveries", e))?;

        let payments: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT order_uid, transaction, request_id, currency, provider, amount, payment_dt,
                   bank, delivery_cost, goods_total, custom_fee
            FROM payments
            WHERE order_uid = ANY($1)
            "#,
        )
        .bind(&uids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::database("load payments", e))?;

        let items: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT order_uid, chrt_id, track_number, price, rid, name, sale, size,
                   total_price, nm_id, brand, status
            FROM items
            WHERE order_uid = ANY($1)
            ORDER BY order_uid, position
            "#,
        )
        .bind(&uids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::database("load items", e))?;

        let mut deliveries: HashMap<String, DeliveryRow> = deliveries
            .into_iter()
            .map(|row| (row.order_uid.clone(), row))
            .collect();
        let mut payments: HashMap<String, PaymentRow> = payments
            .into_iter()
            .map(|row| (row.order_uid.clone(), row))
            .collect();
        let mut items_by_order: HashMap<String, Vec<Item>> = HashMap::new();
        for row in items {
            items_by_order
                .entry(row.order_uid.clone())
                .or_default()
                .push(row.into());
        }

        rows.into_iter()
            .map(|row| -> RepositoryResult<Order> {
                let delivery = deliveries
                    .remove(&row.order_uid)
                    .ok_or_else(|| RepositoryError::integrity(&row.order_uid, "missing delivery"))?;
                let payment = payments
                    .remove(&row.order_uid)
                    .ok_or_else(|| RepositoryError::integrity(&row.order_uid, "missing payment"))?;
                let items = items_by_order.remove(&row.order_uid).unwrap_or_default();

                Ok(Order {
                    order_uid: row.order_uid,
                    track_number: row.track_number,
                    entry: row.entry,
                    delivery: delivery.into(),
                    payment: payment.into(),
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
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    #[instrument(skip(self, order), fields(order_uid = %order.order_uid))]
    async fn insert_order(&self, order: &Order) -> RepositoryResult<InsertOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::database("begin transaction", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (order_uid, track_number, entry, locale, internal_signature,
                                customer_id, delivery_service, shardkey, sm_id, date_created,
                                oof_shard)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (order_uid) DO NOTHING
            "#,
        )
        .bind(&order.order_uid)
        .bind(&order.track_number)
        .bind(&order.entry)
        .bind(&order.locale)
        .bind(&order.internal_signature)
        .bind(&order.customer_id)
        .bind(&order.delivery_service)
        .bind(&order.shardkey)
        .bind(order.sm_id)
        .bind(order.date_created)
        .bind(&order.oof_shard)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::database("insert order", e))?
        .rows_affected();

        if inserted == 0 {
            tx.rollback()
                .await
                .map_err(|e| RepositoryError::database("rollback", e))?;
            debug!("Order already stored");
            return Ok(InsertOutcome::AlreadyPresent);
        }

        Self::insert_children(&mut tx, order)
            .await
            .map_err(|e| RepositoryError::database("insert order parts", e))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::database("commit order", e))?;

        Ok(InsertOutcome::Inserted)
    }

    async fn find_order(&self, order_uid: &str) -> RepositoryResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_uid = $1"
        ))
        .bind(order_uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::database("find order", e))?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_orders(&self) -> RepositoryResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY persisted_seq ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::database("list orders", e))?;

        self.assemble(rows).await
    }

    async fn latest_orders(&self, limit: usize) -> RepositoryResult<Vec<Order>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY persisted_seq DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::database("latest orders", e))?;

        self.assemble(rows).await
    }

    async fn close(&self) -> RepositoryResult<()> {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("Order store connection pool closed");
        }
        Ok(())
    }
}
