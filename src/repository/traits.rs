//! Repository capabilities

use super::errors::RepositoryResult;
use crate::models::Order;
use async_trait::async_trait;

/// Outcome of writing one order to the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// An order with the same id was already stored; nothing was written
    AlreadyPresent,
}

/// Durable order storage without any caching.
///
/// `insert_order` is atomic per order: the order and all of its parts are stored
/// together or not at all. Orders are never updated or deleted once stored.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> RepositoryResult<InsertOutcome>;

    async fn find_order(&self, order_uid: &str) -> RepositoryResult<Option<Order>>;

    /// All orders in persistence order
    async fn list_orders(&self) -> RepositoryResult<Vec<Order>>;

    /// The `limit` most recently persisted orders, most recent first
    async fn latest_orders(&self, limit: usize) -> RepositoryResult<Vec<Order>>;

    async fn close(&self) -> RepositoryResult<()>;
}

/// System-of-record access used by the ingestion pipeline and the query path
#[async_trait]
pub trait OrdersRepository: Send + Sync {
    /// Persist a batch, one atomic write per order, then push each order into the cache.
    /// Re-persisting an already stored order is a no-op, not an error.
    async fn save_to_db(&self, orders: &[Order]) -> RepositoryResult<()>;

    /// Look up one order, consulting the cache first when `use_cache` is set.
    /// `RepositoryError::NotFound` when the order does not exist.
    async fn get_order_by_id(&self, order_uid: &str, use_cache: bool) -> RepositoryResult<Order>;

    async fn get_all_orders(&self) -> RepositoryResult<Vec<Order>>;

    /// Most recently persisted orders, most recent first
    async fn get_latest_orders(&self, limit: usize) -> RepositoryResult<Vec<Order>>;

    /// Release the durable store connection
    async fn close(&self) -> RepositoryResult<()>;
}
