use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Confidence assigned when a backend does not report one.
pub const DEFAULT_CONFIDENCE: f64 = 0.9;

/// Confidence carried by every segment of the degraded stub backend.
pub const STUB_CONFIDENCE: f64 = 0.1;

/// One time-stamped piece of transcribed text.
///
/// Field order is the wire order: `text`, `start_ms`, `end_ms`, `confidence`.
/// Downstream consumers depend on it, so fields must not be reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    pub text: String,
    pub start_ms: u64,
    pub end_ms: u64,
    pub confidence: f64,
}

impl TranscriptionSegment {
    pub fn new(text: impl Into<String>, start_ms: u64, end_ms: u64, confidence: f64) -> Self {
        Self {
            text: text.into(),
            start_ms,
            end_ms,
            confidence,
        }
    }

    /// Check every segment invariant. Nothing is corrected here: a segment
    /// that fails is dropped by the caller.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.text.trim().is_empty() {
            return Err(DomainError::Validation("segment text is empty".to_string()));
        }
        if self.end_ms <= self.start_ms {
            return Err(DomainError::Validation(format!(
                "segment end {}ms is not after start {}ms",
                self.end_ms, self.start_ms
            )));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(DomainError::Validation(format!(
                "confidence {} outside [0.0, 1.0]",
                self.confidence
            )));
        }
        Ok(())
    }

    /// Move window-relative timestamps onto the stream timeline.
    pub fn shifted(mut self, offset_ms: u64) -> Self {
        self.start_ms = self.start_ms.saturating_add(offset_ms);
        self.end_ms = self.end_ms.saturating_add(offset_ms);
        self
    }

    /// Serialize to one line of the downstream wire format, newline included.
    pub fn to_json_line(&self) -> Result<String, DomainError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Parse one line of the wire format. Trailing whitespace is ignored.
    pub fn from_json_line(line: &str) -> Result<Self, DomainError> {
        Ok(serde_json::from_str(line.trim_end())?)
    }
}
