//! # Ingestion Pipeline
//!
//! Consumes order batches from the stream and persists them:
//!
//! ```text
//! Fetching -> Decoding -> Validating -> Persisting -> Acknowledging -> Fetching ...
//!     \
//!      +--> Stopped (consumer closed, consumer failure, or commit failure)
//! ```
//!
//! Messages are processed one at a time. A message is committed only after its valid
//! orders are durably stored. Invalid orders are dropped individually; a message with
//! nothing to persist is dead-lettered (or left for redelivery, see
//! [`IngestionConfig::dead_letter_rejected`]). A persist failure leaves the message
//! unacknowledged so the stream redelivers it. A commit failure after a successful
//! persist ends the loop with [`PipelineError::Fatal`].

use super::errors::{PipelineError, PipelineResult};
use super::state::{PipelineState, PipelineStats};
use crate::config::IngestionConfig;
use crate::logging::{log_error, log_pipeline_operation};
use crate::messaging::{MessageConsumer, StreamMessage};
use crate::models::Order;
use crate::repository::OrdersRepository;
use crate::validation::filter_valid_orders;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// What happened to a single fetched message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Valid orders persisted and the message acknowledged
    Committed { persisted: usize, rejected: usize },
    /// Nothing to persist; message archived
    DeadLettered { reason: String },
    /// Nothing to persist; message left unacknowledged
    Skipped { reason: String },
    /// Store write failed; message left unacknowledged for redelivery
    PersistFailed { reason: String },
}

pub struct IngestionPipeline {
    consumer: Arc<dyn MessageConsumer>,
    repository: Arc<dyn OrdersRepository>,
    config: IngestionConfig,
    stats: Arc<PipelineStats>,
    state: watch::Sender<PipelineState>,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

impl IngestionPipeline {
    pub fn new(
        consumer: Arc<dyn MessageConsumer>,
        repository: Arc<dyn OrdersRepository>,
        config: IngestionConfig,
    ) -> Self {
        let (state, _) = watch::channel(PipelineState::Idle);
        Self {
            consumer,
            repository,
            config,
            stats: Arc::new(PipelineStats::default()),
            state,
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition
    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    fn transition(&self, next: PipelineState) {
        self.state.send_replace(next);
    }

    /// Run until the consumer is closed (`Ok`) or the loop fails (`Err`).
    /// The state is `Stopped` whenever this returns.
    #[instrument(skip(self))]
    pub async fn run(&self) -> PipelineResult<()> {
        info!("Starting ingestion pipeline");

        let result = self.run_loop().await;
        self.transition(PipelineState::Stopped);

        match &result {
            Ok(()) => info!(stats = ?self.stats.snapshot(), "Ingestion pipeline stopped"),
            Err(e) => {
                log_error("ingestion", "run", &e.to_string(), None);
                error!(stats = ?self.stats.snapshot(), "Ingestion pipeline stopped on error");
            }
        }
        result
    }

    async fn run_loop(&self) -> PipelineResult<()> {
        loop {
            self.transition(PipelineState::Fetching);

            let message = match self.consumer.fetch_message().await {
                Ok(message) => message,
                Err(e) if e.is_closed() => {
                    debug!("Consumer closed, leaving fetch loop");
                    return Ok(());
                }
                Err(e) => return Err(PipelineError::Consumer { source: e }),
            };

            self.stats.record_fetched();
            self.process_message(&message).await?;
        }
    }

    /// Take one fetched message through decode, validate, persist and acknowledge
    #[instrument(skip(self, message), fields(msg_id = message.msg_id, read_ct = message.read_ct))]
    pub async fn process_message(&self, message: &StreamMessage) -> PipelineResult<MessageOutcome> {
        if message.is_redelivery() {
            debug!("Processing redelivered message");
        }

        self.transition(PipelineState::Decoding);
        let candidates = match Order::decode_batch(&message.payload) {
            Ok(candidates) => candidates,
            Err(e) => {
                self.stats.record_decode_failure();
                warn!(error = %e, "Failed to decode order batch");
                return Ok(self
                    .reject(message, format!("undecodable payload: {e}"))
                    .await);
            }
        };

        self.transition(PipelineState::Validating);
        let batch = filter_valid_orders(candidates);
        for rejected in &batch.rejected {
            warn!(
                order_uid = %rejected.order_uid,
                reason = %rejected.reason,
                "Dropping invalid order"
            );
        }
        let rejected = batch.rejected.len();
        self.stats.record_rejected(rejected);

        if batch.is_empty() {
            return Ok(self
                .reject(message, format!("no valid orders ({rejected} rejected)"))
                .await);
        }

        self.transition(PipelineState::Persisting);
        let persisted = batch.valid.len();
        if let Err(e) = self.repository.save_to_db(&batch.valid).await {
            self.stats.record_persist_failure();
            error!(error = %e, orders = persisted, "Failed to persist order batch");
            log_pipeline_operation(
                "persist",
                Some(message.msg_id),
                Some(persisted),
                "failed",
                Some("left unacknowledged for redelivery"),
            );
            return Ok(MessageOutcome::PersistFailed {
                reason: e.to_string(),
            });
        }

        self.transition(PipelineState::Acknowledging);
        self.consumer
            .commit_message(message)
            .await
            .map_err(|e| PipelineError::fatal(message.msg_id, e.to_string()))?;

        self.stats.record_committed(persisted);
        log_pipeline_operation(
            "commit",
            Some(message.msg_id),
            Some(persisted),
            "committed",
            None,
        );

        Ok(MessageOutcome::Committed {
            persisted,
            rejected,
        })
    }

    async fn reject(&self, message: &StreamMessage, reason: String) -> MessageOutcome {
        if !self.config.dead_letter_rejected {
            log_pipeline_operation(
                "reject",
                Some(message.msg_id),
                None,
                "skipped",
                Some(&reason),
            );
            return MessageOutcome::Skipped { reason };
        }

        match self.consumer.dead_letter_message(message).await {
            Ok(()) => {
                self.stats.record_dead_lettered();
                log_pipeline_operation(
                    "reject",
                    Some(message.msg_id),
                    None,
                    "dead_lettered",
                    Some(&reason),
                );
                MessageOutcome::DeadLettered { reason }
            }
            Err(e) => {
                warn!(error = %e, "Failed to dead-letter message, leaving it for redelivery");
                MessageOutcome::Skipped { reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryOrdersCache;
    use crate::messaging::{InMemoryStream, MessageProducer};
    use crate::models::order::fixtures::order;
    use crate::repository::{CachedOrdersRepository, InMemoryOrderStore, OrderStore};

    struct Harness {
        stream: Arc<InMemoryStream>,
        store: Arc<InMemoryOrderStore>,
        pipeline: IngestionPipeline,
    }

    fn harness(dead_letter_rejected: bool) -> Harness {
        let stream = Arc::new(InMemoryStream::default());
        let store = Arc::new(InMemoryOrderStore::new());
        let cache = Arc::new(InMemoryOrdersCache::new(10));
        let repository = Arc::new(CachedOrdersRepository::new(store.clone(), cache));
        let pipeline = IngestionPipeline::new(
            stream.clone(),
            repository,
            IngestionConfig {
                dead_letter_rejected,
            },
        );
        Harness {
            stream,
            store,
            pipeline,
        }
    }

    async fn fetch_one(harness: &Harness, payload: &[u8]) -> StreamMessage {
        harness.stream.write_message(payload).await.unwrap();
        harness.stream.fetch_message().await.unwrap()
    }

    #[tokio::test]
    async fn test_valid_batch_is_persisted_and_committed() {
        let h = harness(true);
        let payload = Order::encode_batch(&[order("a"), order("b")]).unwrap();
        let message = fetch_one(&h, &payload).await;

        let outcome = h.pipeline.process_message(&message).await.unwrap();

        assert_eq!(
            outcome,
            MessageOutcome::Committed {
                persisted: 2,
                rejected: 0
            }
        );
        assert_eq!(h.store.len(), 2);
        assert_eq!(h.stream.pending_count(), 0);
        assert_eq!(h.pipeline.state(), PipelineState::Acknowledging);
    }

    #[tokio::test]
    async fn test_invalid_orders_dropped_individually() {
        let h = harness(true);
        let mut bad = order("bad");
        bad.customer_id.clear();
        let payload = Order::encode_batch(&[order("good"), bad]).unwrap();
        let message = fetch_one(&h, &payload).await;

        let outcome = h.pipeline.process_message(&message).await.unwrap();

        assert_eq!(
            outcome,
            MessageOutcome::Committed {
                persisted: 1,
                rejected: 1
            }
        );
        assert!(h.store.find_order("good").await.unwrap().is_some());
        assert!(h.store.find_order("bad").await.unwrap().is_none());
        assert_eq!(h.pipeline.stats().snapshot().orders_rejected, 1);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_dead_lettered() {
        let h = harness(true);
        let message = fetch_one(&h, b"{not json").await;

        let outcome = h.pipeline.process_message(&message).await.unwrap();

        assert!(matches!(outcome, MessageOutcome::DeadLettered { .. }));
        assert_eq!(h.stream.archived_count(), 1);
        assert_eq!(h.pipeline.stats().snapshot().decode_failures, 1);
    }

    #[tokio::test]
    async fn test_rejected_message_left_when_dead_lettering_disabled() {
        let h = harness(false);
        let message = fetch_one(&h, b"[]").await;

        let outcome = h.pipeline.process_message(&message).await.unwrap();

        assert!(matches!(outcome, MessageOutcome::Skipped { .. }));
        assert_eq!(h.stream.pending_count(), 1);
        assert_eq!(h.stream.archived_count(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_cleanly_on_close() {
        let h = harness(true);
        let pipeline = Arc::new(h.pipeline);
        let mut state = pipeline.subscribe_state();

        let task = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run().await })
        };

        state
            .wait_for(|s| *s == PipelineState::Fetching)
            .await
            .unwrap();
        MessageConsumer::close(h.stream.as_ref()).await.unwrap();

        assert!(task.await.unwrap().is_ok());
        assert_eq!(pipeline.state(), PipelineState::Stopped);
    }
}
