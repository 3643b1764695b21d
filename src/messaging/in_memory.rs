//! In-process order queue with pgmq-like visibility semantics.
//!
//! A fetched message stays in the queue but is hidden for the visibility timeout.
//! If it is neither committed nor dead-lettered before the timeout expires, the
//! next fetch hands it out again with an incremented `read_ct`. Payloads are
//! stored as raw bytes, so undecodable messages can be enqueued.

use super::errors::{MessagingError, MessagingResult};
use super::message::StreamMessage;
use super::traits::{MessageConsumer, MessageProducer};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct QueuedMessage {
    message: StreamMessage,
    invisible_until: Option<Instant>,
}

#[derive(Debug, Default)]
struct StreamState {
    messages: VecDeque<QueuedMessage>,
    archived: Vec<StreamMessage>,
    next_id: i64,
}

enum Poll {
    Ready(StreamMessage),
    WaitUntil(Option<Instant>),
}

#[derive(Debug)]
pub struct InMemoryStream {
    state: Mutex<StreamState>,
    available: Notify,
    shutdown: CancellationToken,
    visibility_timeout: Duration,
}

impl InMemoryStream {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(StreamState::default()),
            available: Notify::new(),
            shutdown: CancellationToken::new(),
            visibility_timeout,
        }
    }

    /// Messages not yet committed or dead-lettered, including in-flight ones
    pub fn pending_count(&self) -> usize {
        self.state.lock().messages.len()
    }

    pub fn archived_count(&self) -> usize {
        self.state.lock().archived.len()
    }

    pub fn archived(&self) -> Vec<StreamMessage> {
        self.state.lock().archived.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn poll_next(&self) -> Poll {
        let now = Instant::now();
        let mut state = self.state.lock();
        let mut next_visible: Option<Instant> = None;

        for queued in state.messages.iter_mut() {
            match queued.invisible_until {
                Some(until) if until > now => {
                    next_visible = Some(next_visible.map_or(until, |n| n.min(until)));
                }
                _ => {
                    queued.invisible_until = Some(now + self.visibility_timeout);
                    queued.message.read_ct += 1;
                    return Poll::Ready(queued.message.clone());
                }
            }
        }

        Poll::WaitUntil(next_visible)
    }

    fn take(&self, msg_id: i64) -> MessagingResult<StreamMessage> {
        let mut state = self.state.lock();
        let position = state
            .messages
            .iter()
            .position(|queued| queued.message.msg_id == msg_id)
            .ok_or_else(|| MessagingError::message_not_found("in-memory", msg_id))?;

        state
            .messages
            .remove(position)
            .map(|queued| queued.message)
            .ok_or_else(|| MessagingError::message_not_found("in-memory", msg_id))
    }
}

impl Default for InMemoryStream {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBILITY_TIMEOUT)
    }
}

#[async_trait]
impl MessageConsumer for InMemoryStream {
    async fn fetch_message(&self) -> MessagingResult<StreamMessage> {
        loop {
            if self.shutdown.is_cancelled() {
                return Err(MessagingError::StreamClosed);
            }

            let notified = self.available.notified();

            match self.poll_next() {
                Poll::Ready(message) => return Ok(message),
                Poll::WaitUntil(Some(deadline)) => {
                    tokio::select! {
                        _ = self.shutdown.cancelled() => return Err(MessagingError::StreamClosed),
                        _ = notified => {}
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                Poll::WaitUntil(None) => {
                    tokio::select! {
                        _ = self.shutdown.cancelled() => return Err(MessagingError::StreamClosed),
                        _ = notified => {}
                    }
                }
            }
        }
    }

    async fn commit_message(&self, message: &StreamMessage) -> MessagingResult<()> {
        self.take(message.msg_id)?;
        debug!(msg_id = message.msg_id, "Message committed");
        Ok(())
    }

    async fn dead_letter_message(&self, message: &StreamMessage) -> MessagingResult<()> {
        let archived = self.take(message.msg_id)?;
        self.state.lock().archived.push(archived);
        debug!(msg_id = message.msg_id, "Message archived");
        Ok(())
    }

    async fn close(&self) -> MessagingResult<()> {
        self.shutdown.cancel();
        Ok(())
    }
}

#[async_trait]
impl MessageProducer for InMemoryStream {
    async fn write_message(&self, payload: &[u8]) -> MessagingResult<i64> {
        if self.shutdown.is_cancelled() {
            return Err(MessagingError::StreamClosed);
        }

        let msg_id = {
            let mut state = self.state.lock();
            state.next_id += 1;
            let msg_id = state.next_id;
            state.messages.push_back(QueuedMessage {
                message: StreamMessage {
                    msg_id,
                    read_ct: 0,
                    enqueued_at: Utc::now(),
                    payload: payload.to_vec(),
                },
                invisible_until: None,
            });
            msg_id
        };

        self.available.notify_one();
        Ok(msg_id)
    }

    async fn close(&self) -> MessagingResult<()> {
        MessageConsumer::close(self).await
    }
}
