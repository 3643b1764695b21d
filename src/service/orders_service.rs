//! # Orders Service
//!
//! Owns the ingestion task and the shared handles. Startup warms the cache from the
//! store and spawns the pipeline; shutdown stops the pipeline before releasing the
//! resources it uses.

use super::bootstrap::Dependencies;
use crate::cache::OrdersCache;
use crate::config::OrdersConfig;
use crate::error::{OrdersError, Result};
use crate::ingestion::{IngestionPipeline, PipelineResult, PipelineState, PipelineStats};
use crate::logging::log_service_operation;
use crate::messaging::{MessageConsumer, MessageProducer};
use crate::repository::OrdersRepository;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct OrdersService {
    deps: Dependencies,
    pipeline: Arc<IngestionPipeline>,
    pipeline_task: JoinHandle<PipelineResult<()>>,
    warmed: usize,
}

impl std::fmt::Debug for OrdersService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersService")
            .field("deps", &self.deps)
            .field("state", &self.pipeline.state())
            .field("warmed", &self.warmed)
            .finish()
    }
}

impl OrdersService {
    /// Warm the cache, then spawn the ingestion pipeline
    pub async fn start(deps: Dependencies, config: &OrdersConfig) -> Self {
        let warmed = warm_up(deps.repository.as_ref(), deps.cache.as_ref()).await;

        let pipeline = Arc::new(IngestionPipeline::new(
            deps.consumer.clone(),
            deps.repository.clone(),
            config.ingestion.clone(),
        ));

        let pipeline_task = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.run().await })
        };

        log_service_operation("start", "running", Some(&format!("warmed {warmed} orders")));

        Self {
            deps,
            pipeline,
            pipeline_task,
            warmed,
        }
    }

    /// Query surface
    pub fn repository(&self) -> &Arc<dyn OrdersRepository> {
        &self.deps.repository
    }

    /// Ingress
    pub fn producer(&self) -> &Arc<dyn MessageProducer> {
        &self.deps.producer
    }

    pub fn cache(&self) -> &Arc<dyn OrdersCache> {
        &self.deps.cache
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.pipeline.stats()
    }

    pub fn state(&self) -> PipelineState {
        self.pipeline.state()
    }

    /// Orders loaded into the cache at startup
    pub fn warmed_orders(&self) -> usize {
        self.warmed
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PipelineState> {
        self.pipeline.subscribe_state()
    }

    /// Resolve once the pipeline has stopped on its own or been stopped
    pub async fn stopped(&self) {
        let mut state = self.pipeline.subscribe_state();
        // Sender lives in the pipeline, which this service holds
        let _ = state.wait_for(PipelineState::is_stopped).await;
    }

    /// Close the consumer, join the pipeline, then close repository, cache and
    /// producer. Every failure is collected; the first one does not stop the rest.
    pub async fn shutdown(self) -> Result<()> {
        info!("Shutting down orders service");
        let mut errors = Vec::new();

        if let Err(e) = MessageConsumer::close(self.deps.consumer.as_ref()).await {
            errors.push(format!("consumer: {e}"));
        }

        match self.pipeline_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => errors.push(format!("pipeline: {e}")),
            Err(e) => errors.push(format!("pipeline task: {e}")),
        }

        if let Err(e) = self.deps.repository.close().await {
            errors.push(format!("repository: {e}"));
        }

        if let Err(e) = self.deps.cache.close().await {
            errors.push(format!("cache: {e}"));
        }

        if let Err(e) = MessageProducer::close(self.deps.producer.as_ref()).await {
            errors.push(format!("producer: {e}"));
        }

        if errors.is_empty() {
            log_service_operation("shutdown", "complete", None);
            Ok(())
        } else {
            for e in &errors {
                error!(error = %e, "Shutdown step failed");
            }
            Err(OrdersError::shutdown(errors))
        }
    }
}

async fn warm_up(repository: &dyn OrdersRepository, cache: &dyn OrdersCache) -> usize {
    let capacity = cache.capacity();
    match repository.get_latest_orders(capacity).await {
        Ok(orders) => cache.load_initial_orders(&orders, capacity).await,
        Err(e) => {
            warn!(error = %e, "Failed to load latest orders, cache starts cold");
            0
        }
    }
}
