//! # Bounded Orders Cache
//!
//! Fixed-capacity map `order_uid -> serialized Order` with a score-ordered recency
//! index. Scores come from a per-cache write sequence, so eviction removes the entries
//! written longest ago; reads never reorder.
//!
//! ## Architecture
//!
//! ```text
//! OrdersCache (trait)                <- injected as Arc<dyn OrdersCache>
//!   ├── RedisOrdersCache             <- SET + ZADD + trim in one Lua script
//!   └── InMemoryOrdersCache          <- HashMap + BTreeMap under one mutex
//! ```
//!
//! Cache writes from the repository are best-effort: a failing cache never fails a
//! persist or a store read.

pub mod errors;
pub mod providers;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use providers::{InMemoryOrdersCache, RedisOrdersCache};
pub use traits::OrdersCache;
