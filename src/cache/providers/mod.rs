//! Orders cache provider implementations

pub mod in_memory;
pub mod redis;

pub use self::redis::RedisOrdersCache;
pub use in_memory::InMemoryOrdersCache;
