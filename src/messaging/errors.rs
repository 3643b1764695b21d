//! # Messaging Error Types
//!
//! Structured errors for the order queue consumer and producer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MessagingError {
    /// The consumer or producer was closed; fetch returns this once shutdown begins
    #[error("Stream is closed")]
    StreamClosed,

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Message {message_id} not found in queue {queue_name}")]
    MessageNotFound { queue_name: String, message_id: i64 },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Queue {queue_name} could not be provisioned after {attempts} attempts: {message}")]
    Provisioning {
        queue_name: String,
        attempts: u32,
        message: String,
    },
}

impl MessagingError {
    pub fn database_connection(message: impl Into<String>) -> Self {
        Self::DatabaseConnection {
            message: message.into(),
        }
    }

    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn message_not_found(queue_name: impl Into<String>, message_id: i64) -> Self {
        Self::MessageNotFound {
            queue_name: queue_name.into(),
            message_id,
        }
    }

    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    pub fn provisioning(
        queue_name: impl Into<String>,
        attempts: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::Provisioning {
            queue_name: queue_name.into(),
            attempts,
            message: message.into(),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::StreamClosed)
    }
}

impl From<sqlx::Error> for MessagingError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => MessagingError::StreamClosed,
            other => MessagingError::database_connection(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        MessagingError::message_serialization(err.to_string())
    }
}

impl From<pgmq::errors::PgmqError> for MessagingError {
    fn from(err: pgmq::errors::PgmqError) -> Self {
        MessagingError::queue_operation("unknown", "pgmq", err.to_string())
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
