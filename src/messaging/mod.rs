//! # Messaging Module
//!
//! The order stream: a single consumer with manual acknowledgement feeding the
//! ingestion pipeline, and a producer for writing raw order batches.
//!
//! - [`PgmqStream`] - pgmq-backed queue sharing the repository's `PgPool`
//! - [`InMemoryStream`] - in-process queue with the same visibility semantics

pub mod errors;
pub mod in_memory;
pub mod message;
pub mod pgmq_stream;
pub mod traits;

pub use errors::{MessagingError, MessagingResult};
pub use in_memory::InMemoryStream;
pub use message::StreamMessage;
pub use pgmq_stream::PgmqStream;
pub use traits::{MessageConsumer, MessageProducer};
