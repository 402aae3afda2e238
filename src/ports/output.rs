use crate::domain::{DomainError, TranscriptionSegment};

/// Port for the consumer of finished segments.
pub trait SegmentSink: Send {
    /// Accept one segment.
    ///
    /// Returns `DomainError::Validation` for a malformed segment; the caller
    /// logs it and carries on with the next one.
    fn accept(&mut self, segment: &TranscriptionSegment) -> Result<(), DomainError>;

    /// Flush buffered output. Called once when the stream ends.
    fn flush(&mut self) -> Result<(), DomainError> {
        Ok(())
    }
}
