//! # PostgreSQL Message Queue Stream (pgmq-rs)
//!
//! Order queue backed by pgmq. One `PgmqStream` serves as both the consumer used by
//! the ingestion pipeline and the producer used by the request layer:
//!
//! - fetch: poll `read` with a visibility timeout until a message arrives
//! - commit: `delete`
//! - dead-letter: `archive`
//! - write: `send` of the JSON payload
//!
//! Closing cancels the stream's `CancellationToken`; an in-flight fetch observes the
//! cancellation and returns `MessagingError::StreamClosed`.

use super::errors::{MessagingError, MessagingResult};
use super::message::StreamMessage;
use super::traits::{MessageConsumer, MessageProducer};
use crate::config::StreamConfig;
use async_trait::async_trait;
use pgmq::PGMQueue;
use sqlx::PgPool;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct PgmqStream {
    pgmq: PGMQueue,
    pool: PgPool,
    queue_name: String,
    poll_interval: Duration,
    visibility_timeout_seconds: i32,
    shutdown: CancellationToken,
}

impl PgmqStream {
    /// Create a stream on an existing connection pool
    pub async fn new_with_pool(pool: PgPool, config: &StreamConfig) -> Self {
        let pgmq = PGMQueue::new_with_pool(pool.clone()).await;

        info!(queue = %config.queue_name, "pgmq stream created with shared pool");

        Self {
            pgmq,
            pool,
            queue_name: config.queue_name.clone(),
            poll_interval: config.poll_interval(),
            visibility_timeout_seconds: config.visibility_timeout_seconds,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Create the pgmq extension and the queue if they do not exist
    pub async fn ensure_queue(&self) -> MessagingResult<()> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS pgmq CASCADE")
            .execute(&self.pool)
            .await?;

        self.pgmq
            .create(&self.queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(&self.queue_name, "create", e.to_string()))?;

        debug!(queue = %self.queue_name, "Queue ensured");
        Ok(())
    }

    /// `ensure_queue` with a bounded number of attempts and a fixed backoff between them
    pub async fn ensure_queue_with_retry(
        &self,
        max_attempts: u32,
        backoff: Duration,
    ) -> MessagingResult<()> {
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.ensure_queue().await {
                Ok(()) => {
                    info!(
                        queue = %self.queue_name,
                        attempt = attempt,
                        "Order queue provisioned"
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        queue = %self.queue_name,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        error = %e,
                        "Failed to provision order queue"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    _ = self.shutdown.cancelled() => return Err(MessagingError::StreamClosed),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }

        Err(MessagingError::provisioning(
            &self.queue_name,
            max_attempts,
            last_error,
        ))
    }

    /// Delete every message in the queue (test isolation)
    pub async fn purge(&self) -> MessagingResult<u64> {
        warn!(queue = %self.queue_name, "Purging queue");
        self.pgmq
            .purge(&self.queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(&self.queue_name, "purge", e.to_string()))
    }

    fn ensure_open(&self) -> MessagingResult<()> {
        if self.shutdown.is_cancelled() {
            Err(MessagingError::StreamClosed)
        } else {
            Ok(())
        }
    }

    async fn read_once(&self) -> MessagingResult<Option<StreamMessage>> {
        let message = self
            .pgmq
            .read::<serde_json::Value>(&self.queue_name, Some(self.visibility_timeout_seconds))
            .await
            .map_err(|e| MessagingError::queue_operation(&self.queue_name, "read", e.to_string()))?;

        match message {
            Some(message) => Ok(Some(StreamMessage {
                msg_id: message.msg_id,
                read_ct: message.read_ct,
                enqueued_at: message.enqueued_at,
                payload: serde_json::to_vec(&message.message)?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl MessageConsumer for PgmqStream {
    async fn fetch_message(&self) -> MessagingResult<StreamMessage> {
        loop {
            self.ensure_open()?;

            let read = tokio::select! {
                _ = self.shutdown.cancelled() => return Err(MessagingError::StreamClosed),
                read = self.read_once() => read?,
            };

            if let Some(message) = read {
                debug!(
                    queue = %self.queue_name,
                    msg_id = message.msg_id,
                    read_ct = message.read_ct,
                    "Fetched message"
                );
                return Ok(message);
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => return Err(MessagingError::StreamClosed),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn commit_message(&self, message: &StreamMessage) -> MessagingResult<()> {
        self.pgmq
            .delete(&self.queue_name, message.msg_id)
            .await
            .map_err(|e| MessagingError::queue_operation(&self.queue_name, "delete", e.to_string()))?;

        debug!(queue = %self.queue_name, msg_id = message.msg_id, "Message committed");
        Ok(())
    }

    async fn dead_letter_message(&self, message: &StreamMessage) -> MessagingResult<()> {
        self.pgmq
            .archive(&self.queue_name, message.msg_id)
            .await
            .map_err(|e| MessagingError::queue_operation(&self.queue_name, "archive", e.to_string()))?;

        debug!(queue = %self.queue_name, msg_id = message.msg_id, "Message archived");
        Ok(())
    }

    async fn close(&self) -> MessagingResult<()> {
        if !self.shutdown.is_cancelled() {
            self.shutdown.cancel();
            info!(queue = %self.queue_name, "Order stream closed");
        }
        Ok(())
    }
}

#[async_trait]
impl MessageProducer for PgmqStream {
    async fn write_message(&self, payload: &[u8]) -> MessagingResult<i64> {
        self.ensure_open()?;
        let value: serde_json::Value = serde_json::from_slice(payload)?;

        let msg_id = self
            .pgmq
            .send(&self.queue_name, &value)
            .await
            .map_err(|e| MessagingError::queue_operation(&self.queue_name, "send", e.to_string()))?;

        debug!(queue = %self.queue_name, msg_id = msg_id, "Message written");
        Ok(msg_id)
    }

    async fn close(&self) -> MessagingResult<()> {
        MessageConsumer::close(self).await
    }
}
