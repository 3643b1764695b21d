//! In-process orders cache
//!
//! Same contract as the Redis provider: serialized entries plus a score-ordered recency
//! index, with admission and eviction done under one mutex. Used by tests and by
//! single-process development setups.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::OrdersCache;
use crate::models::Order;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

#[derive(Debug, Default)]
struct CacheState {
    /// order_uid -> (score, serialized order)
    entries: HashMap<String, (u64, String)>,
    /// score -> order_uid, lowest score first
    index: BTreeMap<u64, String>,
    next_score: u64,
}

impl CacheState {
    /// Returns the number of evicted entries
    fn admit(&mut self, order_uid: &str, value: String, capacity: usize) -> usize {
        self.next_score += 1;
        let score = self.next_score;

        if let Some((old_score, _)) = self.entries.insert(order_uid.to_string(), (score, value)) {
            self.index.remove(&old_score);
        }
        self.index.insert(score, order_uid.to_string());

        let mut evicted = 0;
        while self.index.len() > capacity {
            if let Some((_, victim)) = self.index.pop_first() {
                self.entries.remove(&victim);
                evicted += 1;
            }
        }
        evicted
    }
}

#[derive(Debug)]
pub struct InMemoryOrdersCache {
    state: Mutex<CacheState>,
    capacity: usize,
    closed: AtomicBool,
}

impl InMemoryOrdersCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether an entry exists for the id
    pub fn contains(&self, order_uid: &str) -> bool {
        self.state.lock().entries.contains_key(order_uid)
    }

    /// Ids in eviction order (lowest score first)
    pub fn recency_order(&self) -> Vec<String> {
        self.state.lock().index.values().cloned().collect()
    }

    /// Drop every entry (test isolation)
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.index.clear();
    }

    fn ensure_open(&self) -> CacheResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OrdersCache for InMemoryOrdersCache {
    async fn update_cache(&self, order: &Order) -> CacheResult<()> {
        self.ensure_open()?;
        let value = serde_json::to_string(order)?;

        let evicted = self
            .state
            .lock()
            .admit(&order.order_uid, value, self.capacity);

        debug!(
            order_uid = %order.order_uid,
            evicted = evicted,
            "Cache SET (in-memory)"
        );
        Ok(())
    }

    async fn get_from_cache(&self, order_uid: &str) -> CacheResult<Order> {
        self.ensure_open()?;

        let value = self
            .state
            .lock()
            .entries
            .get(order_uid)
            .map(|(_, value)| value.clone());

        match value {
            Some(value) => {
                debug!(order_uid = %order_uid, "Cache HIT (in-memory)");
                Ok(serde_json::from_str(&value)?)
            }
            None => {
                debug!(order_uid = %order_uid, "Cache MISS (in-memory)");
                Err(CacheError::NotFound(order_uid.to_string()))
            }
        }
    }

    async fn cached_count(&self) -> CacheResult<usize> {
        self.ensure_open()?;
        Ok(self.state.lock().index.len())
    }

    async fn close(&self) -> CacheResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::fixtures::order;

    #[tokio::test]
    async fn test_roundtrip() {
        let cache = InMemoryOrdersCache::new(10);
        let o = order("a");
        cache.update_cache(&o).await.unwrap();
        assert_eq!(cache.get_from_cache("a").await.unwrap(), o);
    }

    #[tokio::test]
    async fn test_miss_is_not_found() {
        let cache = InMemoryOrdersCache::new(10);
        let err = cache.get_from_cache("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_evicts_oldest_write() {
        let cache = InMemoryOrdersCache::new(2);
        for uid in ["a", "b", "c"] {
            cache.update_cache(&order(uid)).await.unwrap();
        }

        assert_eq!(cache.cached_count().await.unwrap(), 2);
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[tokio::test]
    async fn test_rewrite_refreshes_recency() {
        let cache = InMemoryOrdersCache::new(2);
        cache.update_cache(&order("a")).await.unwrap();
        cache.update_cache(&order("b")).await.unwrap();
        cache.update_cache(&order("a")).await.unwrap();
        cache.update_cache(&order("c")).await.unwrap();

        assert_eq!(cache.recency_order(), vec!["a".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn test_reads_do_not_promote() {
        let cache = InMemoryOrdersCache::new(2);
        cache.update_cache(&order("a")).await.unwrap();
        cache.update_cache(&order("b")).await.unwrap();
        cache.get_from_cache("a").await.unwrap();
        cache.update_cache(&order("c")).await.unwrap();

        assert!(!cache.contains("a"));
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let cache = InMemoryOrdersCache::new(2);
        cache.close().await.unwrap();
        cache.close().await.unwrap();

        assert!(matches!(
            cache.update_cache(&order("a")).await,
            Err(CacheError::Closed)
        ));
        assert!(matches!(
            cache.get_from_cache("a").await,
            Err(CacheError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_reset_clears_entries() {
        let cache = InMemoryOrdersCache::new(5);
        cache.update_cache(&order("a")).await.unwrap();
        cache.reset();
        assert_eq!(cache.cached_count().await.unwrap(), 0);
    }
}
