//! # Ingestion
//!
//! The long-running loop that turns queued order batches into stored orders.

pub mod errors;
pub mod pipeline;
pub mod state;

pub use errors::{PipelineError, PipelineResult};
pub use pipeline::{IngestionPipeline, MessageOutcome};
pub use state::{PipelineState, PipelineStats, PipelineStatsSnapshot};
