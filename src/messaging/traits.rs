//! Stream consumer and producer capabilities

use super::errors::MessagingResult;
use super::message::StreamMessage;
use async_trait::async_trait;

/// Single logical consumer of the order queue with manual acknowledgement
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Wait for the next message. Returns `MessagingError::StreamClosed` once the
    /// consumer is closed, including while a fetch is in flight.
    async fn fetch_message(&self) -> MessagingResult<StreamMessage>;

    /// Acknowledge a processed message so it is never redelivered
    async fn commit_message(&self, message: &StreamMessage) -> MessagingResult<()>;

    /// Move a message out of the queue into the archive without processing it
    async fn dead_letter_message(&self, message: &StreamMessage) -> MessagingResult<()>;

    async fn close(&self) -> MessagingResult<()>;
}

/// Writer side of the order queue
#[async_trait]
pub trait MessageProducer: Send + Sync {
    /// Enqueue a raw payload, returning the queue-assigned message id
    async fn write_message(&self, payload: &[u8]) -> MessagingResult<i64>;

    async fn close(&self) -> MessagingResult<()>;
}
