//! # Dependency Bootstrap
//!
//! Builds the capability handles the service runs on. Production wiring shares one
//! `PgPool` between the order store and the pgmq stream.

use crate::cache::{InMemoryOrdersCache, OrdersCache, RedisOrdersCache};
use crate::config::OrdersConfig;
use crate::database::{run_migrations, DatabaseConnection};
use crate::error::Result;
use crate::messaging::{InMemoryStream, MessageConsumer, MessageProducer, PgmqStream};
use crate::repository::{CachedOrdersRepository, InMemoryOrderStore, OrdersRepository, PgOrderStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Injected handles for one service instance
#[derive(Clone)]
pub struct Dependencies {
    pub repository: Arc<dyn OrdersRepository>,
    pub cache: Arc<dyn OrdersCache>,
    pub consumer: Arc<dyn MessageConsumer>,
    pub producer: Arc<dyn MessageProducer>,
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependencies")
            .field("cache", &self.cache.provider_name())
            .finish_non_exhaustive()
    }
}

impl Dependencies {
    pub fn from_parts(
        repository: Arc<dyn OrdersRepository>,
        cache: Arc<dyn OrdersCache>,
        consumer: Arc<dyn MessageConsumer>,
        producer: Arc<dyn MessageProducer>,
    ) -> Self {
        Self {
            repository,
            cache,
            consumer,
            producer,
        }
    }

    /// PostgreSQL store, Redis cache and pgmq stream
    pub async fn connect(config: &OrdersConfig) -> Result<Self> {
        info!(environment = %config.environment, "Connecting service dependencies");

        let database = DatabaseConnection::connect(&config.database).await?;

        match Self::connect_with_pool(&database, config).await {
            Ok(deps) => Ok(deps),
            Err(e) => {
                warn!(error = %e, "Dependency wiring failed, closing database pool");
                database.close().await;
                Err(e)
            }
        }
    }

    async fn connect_with_pool(database: &DatabaseConnection, config: &OrdersConfig) -> Result<Self> {
        let pool = database.pool().clone();

        if config.database.run_migrations {
            run_migrations(&pool).await?;
        }

        let cache: Arc<dyn OrdersCache> = Arc::new(RedisOrdersCache::from_config(&config.cache).await?);

        let stream = Arc::new(PgmqStream::new_with_pool(pool.clone(), &config.stream).await);
        if let Err(e) = stream
            .ensure_queue_with_retry(
                config.stream.provision_max_attempts,
                config.stream.provision_backoff(),
            )
            .await
        {
            if let Err(close_err) = cache.close().await {
                warn!(error = %close_err, "Failed to close cache after provisioning failure");
            }
            return Err(e.into());
        }

        let store = Arc::new(PgOrderStore::new(pool));
        let repository = Arc::new(CachedOrdersRepository::new(store, cache.clone()));

        Ok(Self {
            repository,
            cache,
            consumer: stream.clone(),
            producer: stream,
        })
    }

    /// Fully in-process backends with the configured cache capacity
    pub fn in_memory(config: &OrdersConfig) -> Self {
        let cache: Arc<dyn OrdersCache> = Arc::new(InMemoryOrdersCache::new(config.cache.capacity));
        let store = Arc::new(InMemoryOrderStore::new());
        let stream = Arc::new(InMemoryStream::new(std::time::Duration::from_secs(
            config.stream.visibility_timeout_seconds.max(0) as u64,
        )));

        Self {
            repository: Arc::new(CachedOrdersRepository::new(store, cache.clone())),
            cache,
            consumer: stream.clone(),
            producer: stream,
        }
    }
}
