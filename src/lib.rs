#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Orders Core
//!
//! Order ingestion service core: a stream-fed pipeline that validates and durably
//! persists order batches, and a bounded write-recency cache that keeps the most
//! recently persisted orders hot for the query path.
//!
//! ## Architecture
//!
//! ```text
//! producer -> queue -> IngestionPipeline -> OrdersRepository -> OrderStore (PostgreSQL)
//!                                                   |
//!                                                   +-------> OrdersCache (Redis)
//! ```
//!
//! Every collaborator is an injected capability (`Arc<dyn Trait>`), so the pipeline and
//! the repository run unchanged against the in-process backends used by the tests.
//!
//! ## Module Organization
//!
//! - [`models`] - `Order` aggregate and its value objects
//! - [`validation`] - structural order invariants and partial-batch filtering
//! - [`cache`] - bounded write-recency cache (Redis and in-process backends)
//! - [`repository`] - durable order store with write-through / read-through caching
//! - [`messaging`] - queue consumer and producer capabilities (pgmq and in-process)
//! - [`ingestion`] - fetch / decode / validate / persist / acknowledge loop
//! - [`service`] - startup warm-up, pipeline task ownership and ordered shutdown
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - structured logging setup
//! - [`error`] - crate-level error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orders_core::config::ConfigManager;
//! use orders_core::service::{Dependencies, OrdersService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load()?;
//! let deps = Dependencies::connect(config.config()).await?;
//! let service = OrdersService::start(deps, config.config()).await;
//!
//! let latest = service.repository().get_latest_orders(10).await?;
//! println!("{} recent orders", latest.len());
//!
//! service.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test                           # Unit + integration tests (in-process backends)
//! cargo test --features test-services  # Also run PostgreSQL / Redis backed tests
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod ingestion;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod repository;
pub mod service;
pub mod validation;

pub use cache::{CacheError, InMemoryOrdersCache, OrdersCache, RedisOrdersCache};
pub use config::{ConfigManager, OrdersConfig};
pub use error::{OrdersError, Result};
pub use ingestion::{IngestionPipeline, PipelineState, PipelineStats};
pub use messaging::{InMemoryStream, MessageConsumer, MessageProducer, PgmqStream};
pub use models::{Delivery, Item, Order, Payment};
pub use repository::{
    CachedOrdersRepository, InMemoryOrderStore, OrderStore, OrdersRepository, PgOrderStore,
    RepositoryError,
};
pub use service::{Dependencies, OrdersService};
