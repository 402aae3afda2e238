use async_trait::async_trait;

use crate::domain::{AudioWindow, BackendCapability, DomainError, TranscriptionSegment};

/// Port for speech-to-text on one audio window.
///
/// Implementations are the concrete backend strategies (whisper.cpp CLI,
/// whisper server, remote API, stub) and the dispatcher that binds one of
/// them. The engine only ever sees this trait.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one window.
    ///
    /// Segment timestamps are relative to the start of the window. Failures
    /// are returned as errors and never panic; the caller decides whether the
    /// stream goes on.
    async fn transcribe(
        &self,
        window: &AudioWindow,
    ) -> Result<Vec<TranscriptionSegment>, DomainError>;

    /// Execution mode this backend runs in. Fixed once bound.
    fn capability(&self) -> BackendCapability;

    /// Backend name for logs.
    fn name(&self) -> &str;
}
