use crate::messaging::MessagingError;
use thiserror::Error;

/// Errors that end the pipeline loop
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A persisted batch could not be acknowledged
    #[error("Fatal: message {msg_id} was persisted but could not be committed: {message}")]
    Fatal { msg_id: i64, message: String },

    /// The consumer failed for a reason other than being closed
    #[error("Consumer failed: {source}")]
    Consumer {
        #[source]
        source: MessagingError,
    },
}

impl PipelineError {
    pub fn fatal(msg_id: i64, message: impl Into<String>) -> Self {
        Self::Fatal {
            msg_id,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
