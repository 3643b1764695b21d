//! # Order Repository
//!
//! System of record for orders.
//!
//! - [`OrderStore`] - durable storage only (`PgOrderStore`, `InMemoryOrderStore`)
//! - [`OrdersRepository`] - what the pipeline and the query path use
//! - [`CachedOrdersRepository`] - `OrdersRepository` over a store plus an
//!   `OrdersCache`, keeping the cache warm on writes and store hits

pub mod cached;
pub mod errors;
pub mod in_memory;
pub mod postgres;
pub mod traits;

pub use cached::CachedOrdersRepository;
pub use errors::{RepositoryError, RepositoryResult};
pub use in_memory::InMemoryOrderStore;
pub use postgres::PgOrderStore;
pub use traits::{InsertOutcome, OrderStore, OrdersRepository};
