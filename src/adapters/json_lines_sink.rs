use std::io::Write;

use tracing::trace;

use crate::domain::{DomainError, TranscriptionSegment};
use crate::ports::SegmentSink;

/// Writes each segment as one JSON object per line.
pub struct JsonLinesSink<W> {
    writer: W,
    written: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of lines written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SegmentSink for JsonLinesSink<W> {
    fn accept(&mut self, segment: &TranscriptionSegment) -> Result<(), DomainError> {
        segment.validate()?;

        let line = segment.to_json_line()?;
        self.writer.write_all(line.as_bytes())?;
        // Consumers read line by line as the stream runs.
        self.writer.flush()?;
        self.written += 1;

        trace!(start_ms = segment.start_ms, end_ms = segment.end_ms, "Segment written");
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DomainError> {
        self.writer.flush()?;
        Ok(())
    }
}
