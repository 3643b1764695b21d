//! Orders cache trait definition

use super::errors::CacheResult;
use crate::models::Order;
use async_trait::async_trait;
use tracing::{info, warn};

/// Bounded order cache with write-recency eviction.
///
/// Every admitted order receives a score higher than any existing one. Whenever the
/// number of entries would exceed [`capacity`](OrdersCache::capacity), the
/// lowest-scored entries are evicted in the same atomic step as the admission.
/// Reads never change an entry's score.
#[async_trait]
pub trait OrdersCache: Send + Sync {
    /// Upsert an order and evict down to capacity
    async fn update_cache(&self, order: &Order) -> CacheResult<()>;

    /// Fetch an order; `CacheError::NotFound` on a miss
    async fn get_from_cache(&self, order_uid: &str) -> CacheResult<Order>;

    /// Number of entries currently tracked by the recency index
    async fn cached_count(&self) -> CacheResult<usize>;

    /// Release the backend connection. Later calls fail with `CacheError::Closed`.
    async fn close(&self) -> CacheResult<()>;

    /// Maximum number of entries
    fn capacity(&self) -> usize;

    /// Name of the backing provider
    fn provider_name(&self) -> &'static str;

    /// Warm the cache from orders given most-recent-first.
    ///
    /// At most `min(limit, capacity)` leading orders are admitted, oldest first, so the
    /// most recent order ends with the highest score. Failures are logged and skipped;
    /// returns the number of orders admitted.
    async fn load_initial_orders(&self, orders: &[Order], limit: usize) -> usize {
        let take = limit.min(self.capacity()).min(orders.len());
        let mut loaded = 0;

        for order in orders[..take].iter().rev() {
            match self.update_cache(order).await {
                Ok(()) => loaded += 1,
                Err(e) => warn!(
                    order_uid = %order.order_uid,
                    error = %e,
                    "Failed to warm cache entry"
                ),
            }
        }

        info!(
            provider = self.provider_name(),
            requested = take,
            loaded = loaded,
            "Cache warm-up complete"
        );

        loaded
    }
}
