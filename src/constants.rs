//! # System Constants
//!
//! Operational boundaries of the order service: cache sizing, key naming and
//! queue provisioning defaults.

/// Cache sizing and key layout
pub mod cache {
    /// Maximum number of orders held in the cache
    pub const DEFAULT_CAPACITY: usize = 200;

    /// Sorted set holding `(order_uid, score)` pairs ordered by write sequence
    pub const RECENCY_INDEX_KEY: &str = "LRU-orders";

    /// Prefix for the string keys holding serialized orders
    pub const ENTRY_KEY_PREFIX: &str = "order:";

    /// Suffix appended to the recency index key for the write-sequence counter
    pub const SEQUENCE_KEY_SUFFIX: &str = ":seq";
}

/// Stream / queue defaults
pub mod stream {
    pub const DEFAULT_QUEUE_NAME: &str = "orders";
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;
    pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: i32 = 30;

    /// Queue provisioning retry policy at startup
    pub const PROVISION_MAX_ATTEMPTS: u32 = 10;
    pub const PROVISION_BACKOFF_SECONDS: u64 = 5;
}

/// Database defaults
pub mod database {
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    pub const DEFAULT_ACQUIRE_TIMEOUT_SECONDS: u64 = 5;
}
