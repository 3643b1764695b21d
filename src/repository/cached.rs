//! Write-through / read-through repository
//!
//! Combines an `OrderStore` with an `OrdersCache`. The store is authoritative; the
//! cache is updated after each durable write and after each store hit. Cache failures
//! are logged and never fail the repository operation.

use super::errors::{RepositoryError, RepositoryResult};
use super::traits::{InsertOutcome, OrderStore, OrdersRepository};
use crate::cache::OrdersCache;
use crate::models::Order;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct CachedOrdersRepository {
    store: Arc<dyn OrderStore>,
    cache: Arc<dyn OrdersCache>,
}

impl std::fmt::Debug for CachedOrdersRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedOrdersRepository")
            .field("cache", &self.cache.provider_name())
            .finish()
    }
}

impl CachedOrdersRepository {
    pub fn new(store: Arc<dyn OrderStore>, cache: Arc<dyn OrdersCache>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &Arc<dyn OrdersCache> {
        &self.cache
    }

    async fn warm_cache(&self, order: &Order) {
        if let Err(e) = self.cache.update_cache(order).await {
            warn!(
                order_uid = %order.order_uid,
                error = %e,
                "Failed to update cache; store remains authoritative"
            );
        }
    }

    /// Cache the stored copy of an order, which may differ from a redelivered payload
    async fn warm_cache_from_store(&self, order_uid: &str) {
        match self.store.find_order(order_uid).await {
            Ok(Some(stored)) => self.warm_cache(&stored).await,
            Ok(None) => {}
            Err(e) => warn!(
                order_uid = %order_uid,
                error = %e,
                "Failed to read stored order for cache refresh"
            ),
        }
    }
}

#[async_trait]
impl OrdersRepository for CachedOrdersRepository {
    #[instrument(skip(self, orders), fields(batch_size = orders.len()))]
    async fn save_to_db(&self, orders: &[Order]) -> RepositoryResult<()> {
        let mut inserted = 0usize;

        for order in orders {
            match self.store.insert_order(order).await? {
                InsertOutcome::Inserted => {
                    inserted += 1;
                    self.warm_cache(order).await;
                }
                InsertOutcome::AlreadyPresent => {
                    debug!(
                        order_uid = %order.order_uid,
                        "Order already stored, treating redelivery as success"
                    );
                    self.warm_cache_from_store(&order.order_uid).await;
                }
            }
        }

        info!(
            inserted = inserted,
            redelivered = orders.len() - inserted,
            "Persisted order batch"
        );
        Ok(())
    }

    async fn get_order_by_id(&self, order_uid: &str, use_cache: bool) -> RepositoryResult<Order> {
        if use_cache {
            match self.cache.get_from_cache(order_uid).await {
                Ok(order) => return Ok(order),
                Err(e) if e.is_not_found() => {
                    debug!(order_uid = %order_uid, "Cache miss, reading store");
                }
                Err(e) => {
                    warn!(order_uid = %order_uid, error = %e, "Cache read failed, reading store");
                }
            }
        }

        let order = self
            .store
            .find_order(order_uid)
            .await?
            .ok_or_else(|| RepositoryError::not_found(order_uid))?;

        self.warm_cache(&order).await;
        Ok(order)
    }

    async fn get_all_orders(&self) -> RepositoryResult<Vec<Order>> {
        self.store.list_orders().await
    }

    async fn get_latest_orders(&self, limit: usize) -> RepositoryResult<Vec<Order>> {
        self.store.latest_orders(limit).await
    }

    async fn close(&self) -> RepositoryResult<()> {
        self.store.close().await
    }
}
