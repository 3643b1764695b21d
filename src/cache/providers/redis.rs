//! Redis orders cache
//!
//! Uses `redis::aio::ConnectionManager` for async multiplexed connections. Entries are
//! plain string keys (`{prefix}{order_uid}`) holding the serialized order; the recency
//! index is a sorted set scored by a per-cache write sequence (`INCR`). Admission and
//! eviction run in one Lua script, so the index and the entries never disagree and the
//! index never exceeds capacity.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::OrdersCache;
use crate::config::loader::redact_url;
use crate::config::CacheConfig;
use crate::constants;
use crate::models::Order;
use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tracing::{debug, info};

/// KEYS[1] recency index, KEYS[2] sequence counter, KEYS[3] entry key
/// ARGV[1] order_uid, ARGV[2] serialized order, ARGV[3] capacity, ARGV[4] entry key prefix
const ADMIT_SCRIPT: &str = r"
local score = redis.call('INCR', KEYS[2])
redis.call('SET', KEYS[3], ARGV[2])
redis.call('ZADD', KEYS[1], score, ARGV[1])
local overflow = redis.call('ZCARD', KEYS[1]) - tonumber(ARGV[3])
if overflow <= 0 then
  return 0
end
local victims = redis.call('ZRANGE', KEYS[1], 0, overflow - 1)
for _, uid in ipairs(victims) do
  redis.call('DEL', ARGV[4] .. uid)
end
redis.call('ZREMRANGEBYRANK', KEYS[1], 0, overflow - 1)
return #victims
";

/// Redis-backed bounded orders cache
///
/// Clones share one connection manager; closing any clone releases it for all.
#[derive(Clone)]
pub struct RedisOrdersCache {
    connection_manager: Arc<Mutex<Option<ConnectionManager>>>,
    admit_script: redis::Script,
    capacity: usize,
    recency_index_key: String,
    sequence_key: String,
    entry_key_prefix: String,
}

impl std::fmt::Debug for RedisOrdersCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisOrdersCache")
            .field("open", &self.connection_manager.lock().is_some())
            .field("capacity", &self.capacity)
            .field("recency_index_key", &self.recency_index_key)
            .finish()
    }
}

impl RedisOrdersCache {
    /// Connect using the cache configuration. The URL path selects the logical database.
    pub async fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {e}"))
        })?;

        let connection_manager = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Failed to connect to Redis: {e}")))?;

        info!(
            url = %redact_url(&config.url),
            capacity = config.capacity,
            recency_index = %config.recency_index_key,
            "Redis orders cache connected"
        );

        Ok(Self {
            connection_manager: Arc::new(Mutex::new(Some(connection_manager))),
            admit_script: redis::Script::new(ADMIT_SCRIPT),
            capacity: config.capacity.max(1),
            sequence_key: format!(
                "{}{}",
                config.recency_index_key,
                constants::cache::SEQUENCE_KEY_SUFFIX
            ),
            recency_index_key: config.recency_index_key.clone(),
            entry_key_prefix: config.entry_key_prefix.clone(),
        })
    }

    /// Delete every key in the selected logical database (test isolation)
    pub async fn flush(&self) -> CacheResult<()> {
        let mut conn = self.connection()?;
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::BackendError(format!("Redis FLUSHDB failed: {e}")))?;

        debug!("Cache FLUSHDB");
        Ok(())
    }

    /// Ids in eviction order (lowest score first)
    pub async fn recency_order(&self) -> CacheResult<Vec<String>> {
        let mut conn = self.connection()?;
        redis::cmd("ZRANGE")
            .arg(&self.recency_index_key)
            .arg(0)
            .arg(-1)
            .query_async::<Vec<String>>(&mut conn)
            .await
            .map_err(|e| CacheError::BackendError(format!("Redis ZRANGE failed: {e}")))
    }

    fn entry_key(&self, order_uid: &str) -> String {
        format!("{}{}", self.entry_key_prefix, order_uid)
    }

    fn connection(&self) -> CacheResult<ConnectionManager> {
        self.connection_manager
            .lock()
            .as_ref()
            .cloned()
            .ok_or(CacheError::Closed)
    }
}

#[async_trait]
impl OrdersCache for RedisOrdersCache {
    async fn update_cache(&self, order: &Order) -> CacheResult<()> {
        let value = serde_json::to_string(order)?;
        let mut conn = self.connection()?;

        let evicted: i64 = self
            .admit_script
            .key(&self.recency_index_key)
            .key(&self.sequence_key)
            .key(self.entry_key(&order.order_uid))
            .arg(&order.order_uid)
            .arg(value)
            .arg(self.capacity)
            .arg(&self.entry_key_prefix)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendError(format!("Redis admit script failed: {e}")))?;

        debug!(
            order_uid = %order.order_uid,
            evicted = evicted,
            "Cache SET"
        );
        Ok(())
    }

    async fn get_from_cache(&self, order_uid: &str) -> CacheResult<Order> {
        let mut conn = self.connection()?;

        let value: Option<String> = redis::cmd("GET")
            .arg(self.entry_key(order_uid))
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendError(format!("Redis GET failed: {e}")))?;

        match value {
            Some(value) => {
                debug!(order_uid = %order_uid, "Cache HIT");
                Ok(serde_json::from_str(&value)?)
            }
            None => {
                debug!(order_uid = %order_uid, "Cache MISS");
                Err(CacheError::NotFound(order_uid.to_string()))
            }
        }
    }

    async fn cached_count(&self) -> CacheResult<usize> {
        let mut conn = self.connection()?;
        redis::cmd("ZCARD")
            .arg(&self.recency_index_key)
            .query_async::<usize>(&mut conn)
            .await
            .map_err(|e| CacheError::BackendError(format!("Redis ZCARD failed: {e}")))
    }

    async fn close(&self) -> CacheResult<()> {
        if self.connection_manager.lock().take().is_some() {
            info!("Redis orders cache closed");
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }
}
