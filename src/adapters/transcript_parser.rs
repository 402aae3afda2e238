use serde::Deserialize;

use crate::domain::{DomainError, TranscriptionSegment, DEFAULT_CONFIDENCE};

/// Output shapes accepted from backends, tried in order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BackendOutput {
    /// whisper.cpp CLI `-oj` file.
    Cli { transcription: Vec<CliSegment> },
    /// `verbose_json` from whisper server and OpenAI-compatible APIs.
    Verbose {
        segments: Vec<VerboseSegment>,
        #[serde(default)]
        text: Option<String>,
    },
    /// Unsegmented `{"text": ...}`.
    Text { text: String },
}

#[derive(Debug, Deserialize)]
struct CliSegment {
    offsets: CliOffsets,
    text: String,
}

#[derive(Debug, Deserialize)]
struct CliOffsets {
    from: u64,
    to: u64,
}

#[derive(Debug, Deserialize)]
struct VerboseSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    avg_logprob: Option<f64>,
}

/// Convert a backend response body into window-relative segments.
///
/// Segmented output keeps its timing. Unsegmented output (a bare `text`
/// field or a plain-text body) becomes one segment spanning the window.
/// Blank text yields no segments; an unparsable JSON body is an error.
pub fn parse_output(
    body: &str,
    window_duration_ms: u64,
) -> Result<Vec<TranscriptionSegment>, DomainError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(Vec::new());
    }

    if !body.starts_with('{') {
        return Ok(whole_window(body, window_duration_ms));
    }

    let output: BackendOutput = serde_json::from_str(body).map_err(|e| {
        DomainError::transcription(format!("unrecognised backend output: {}", e))
    })?;

    let segments = match output {
        BackendOutput::Cli { transcription } => transcription
            .into_iter()
            .map(|s| {
                TranscriptionSegment::new(
                    s.text.trim(),
                    s.offsets.from,
                    s.offsets.to,
                    DEFAULT_CONFIDENCE,
                )
            })
            .collect(),
        BackendOutput::Verbose { segments, text } if segments.is_empty() => {
            whole_window(text.as_deref().unwrap_or_default(), window_duration_ms)
        }
        BackendOutput::Verbose { segments, .. } => segments
            .into_iter()
            .map(|s| {
                let confidence = s
                    .confidence
                    .or_else(|| s.avg_logprob.map(f64::exp))
                    .unwrap_or(DEFAULT_CONFIDENCE);
                TranscriptionSegment::new(
                    s.text.trim(),
                    secs_to_ms(s.start),
                    secs_to_ms(s.end),
                    confidence,
                )
            })
            .collect(),
        BackendOutput::Text { text } => whole_window(&text, window_duration_ms),
    };

    Ok(segments)
}

fn whole_window(text: &str, window_duration_ms: u64) -> Vec<TranscriptionSegment> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    vec![TranscriptionSegment::new(
        text,
        0,
        window_duration_ms.max(1),
        DEFAULT_CONFIDENCE,
    )]
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}
