use chrono::{DateTime, Utc};

/// A message read from the order queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// Queue-assigned id, used to commit or dead-letter the message
    pub msg_id: i64,
    /// Number of times this message has been read, including this read
    pub read_ct: i32,
    pub enqueued_at: DateTime<Utc>,
    pub payload: Vec<u8>,
}

impl StreamMessage {
    /// Whether the stream has handed this message out before
    pub fn is_redelivery(&self) -> bool {
        self.read_ct > 1
    }
}
