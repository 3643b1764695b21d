//! Repository error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No order with this id exists in the store
    #[error("Order not found: {order_uid}")]
    NotFound { order_uid: String },

    #[error("Database error during {operation}: {message}")]
    Database { operation: String, message: String },

    /// Stored aggregate is missing a required child row
    #[error("Stored order {order_uid} is incomplete: {reason}")]
    Integrity { order_uid: String, reason: String },

    #[error("Repository is closed")]
    Closed,
}

impl RepositoryError {
    pub fn not_found(order_uid: impl Into<String>) -> Self {
        Self::NotFound {
            order_uid: order_uid.into(),
        }
    }

    /// Wrap a sqlx error with the operation that raised it
    pub fn database(operation: impl Into<String>, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => Self::Closed,
            other => Self::Database {
                operation: operation.into(),
                message: other.to_string(),
            },
        }
    }

    pub fn integrity(order_uid: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Integrity {
            order_uid: order_uid.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::database("query", err)
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
