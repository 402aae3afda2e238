use async_trait::async_trait;
use tracing::warn;

use crate::domain::{
    AudioWindow, BackendCapability, DomainError, TranscriptionSegment, STUB_CONFIDENCE,
};
use crate::ports::Transcriber;

/// Deterministic placeholder transcriber.
///
/// Always binds, so the engine runs even with no real backend installed.
/// Its output is marked by [`STUB_CONFIDENCE`] so consumers can tell it apart.
pub struct StubBackend;

impl StubBackend {
    pub fn new() -> Self {
        warn!(
            confidence = STUB_CONFIDENCE,
            "No transcription backend available, using stub output (degraded)"
        );
        Self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcriber for StubBackend {
    async fn transcribe(
        &self,
        window: &AudioWindow,
    ) -> Result<Vec<TranscriptionSegment>, DomainError> {
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let duration_ms = window.duration_ms().max(1);
        Ok(vec![TranscriptionSegment::new(
            format!("[stub] window {} ({} ms)", window.sequence(), duration_ms),
            0,
            duration_ms,
            STUB_CONFIDENCE,
        )])
    }

    fn capability(&self) -> BackendCapability {
        BackendCapability::unaccelerated()
    }

    fn name(&self) -> &str {
        "stub"
    }
}
