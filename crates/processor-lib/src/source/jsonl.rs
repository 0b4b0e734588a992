//! Newline-delimited JSON replay source

use super::{EventSource, SourceMessage};
use crate::error::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::debug;

/// Topic name reported for replayed messages
pub const REPLAY_TOPIC: &str = "replay";

/// Reads one event per line. Blank lines are skipped; the offset of a
/// message is its zero-based line number.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    next_line: i64,
    exhausted: bool,
    committed: Option<i64>,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            next_line: 0,
            exhausted: false,
            committed: None,
        }
    }

    /// Offset of the last acknowledged message
    pub fn committed(&self) -> Option<i64> {
        self.committed
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> EventSource for JsonLinesSource<R> {
    async fn poll(&mut self) -> Result<Option<SourceMessage>> {
        while let Some(line) = self.lines.next_line().await? {
            let offset = self.next_line;
            self.next_line += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Ok(Some(SourceMessage {
                payload: line.into_bytes(),
                topic: REPLAY_TOPIC.to_string(),
                partition: 0,
                offset,
            }));
        }

        if !self.exhausted {
            debug!(lines = self.next_line, "Replay input exhausted");
        }
        self.exhausted = true;
        Ok(None)
    }

    async fn commit(&mut self, message: &SourceMessage) -> Result<()> {
        self.committed = Some(message.offset);
        Ok(())
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
