//! Inbound message sources
//!
//! The consumer loop pulls raw payloads from an [`EventSource`] and
//! acknowledges them once handled. [`JsonLinesSource`] replays events from a
//! file or stdin; the Kafka source lives behind the `kafka` feature.

mod jsonl;
#[cfg(feature = "kafka")]
mod kafka;

pub use jsonl::JsonLinesSource;
#[cfg(feature = "kafka")]
pub use kafka::{KafkaSource, KafkaSourceConfig};

use crate::error::Result;
use async_trait::async_trait;

/// One raw message and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMessage {
    pub payload: Vec<u8>,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

#[async_trait]
pub trait EventSource: Send {
    /// Wait for the next message. `Ok(None)` means nothing arrived in time,
    /// or the source ran dry if [`EventSource::is_exhausted`] says so.
    async fn poll(&mut self) -> Result<Option<SourceMessage>>;

    /// Acknowledge a handled message
    async fn commit(&mut self, message: &SourceMessage) -> Result<()>;

    /// Whether no further messages will ever arrive
    fn is_exhausted(&self) -> bool {
        false
    }
}
