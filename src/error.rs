//! # Error Types
//!
//! Crate-level error aggregating the per-module error types. Module boundaries return
//! their own error (`CacheError`, `RepositoryError`, `MessagingError`, ...); service
//! wiring and the binary work with `OrdersError`.

use crate::cache::CacheError;
use crate::config::ConfigurationError;
use crate::ingestion::PipelineError;
use crate::messaging::MessagingError;
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrdersError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Every error raised while closing resources, in close order
    #[error("Shutdown failed: {}", .errors.join("; "))]
    Shutdown { errors: Vec<String> },
}

impl OrdersError {
    pub fn shutdown(errors: Vec<String>) -> Self {
        Self::Shutdown { errors }
    }
}

pub type Result<T> = std::result::Result<T, OrdersError>;
