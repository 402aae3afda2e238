#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use livescribe::app::{PerformanceMonitor, RuntimeSettings, TranscriptionEngine};
use livescribe::domain::{
    AudioWindow, BackendCapability, DomainError, StreamConfig, TranscriptionSegment,
};
use livescribe::ports::{AudioSource, Transcriber};

/// 1 byte per millisecond: 100-byte windows, 20-byte overlap, 80-byte step.
pub fn stream_config(timeout_secs: f64) -> StreamConfig {
    StreamConfig {
        chunk_duration_secs: 0.1,
        overlap_secs: 0.02,
        timeout_secs,
        sample_rate: 1000,
        bytes_per_sample: 1,
    }
}

pub const WINDOW: usize = 100;
pub const STEP: usize = 80;

pub enum Step {
    Data(Vec<u8>),
    /// Report end-of-data until this much time has passed.
    Pause(Duration),
    Fail(String),
}

/// Audio source that plays back a fixed script, then stays drained.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    paused_until: Option<Instant>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            paused_until: None,
        }
    }
}

#[async_trait]
impl AudioSource for ScriptedSource {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, DomainError> {
        loop {
            match self.steps.front_mut() {
                None => return Ok(0),
                Some(Step::Data(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    bytes.drain(..n);
                    if bytes.is_empty() {
                        self.steps.pop_front();
                    }
                    return Ok(n);
                }
                Some(Step::Pause(duration)) => {
                    let until = *self
                        .paused_until
                        .get_or_insert_with(|| Instant::now() + *duration);
                    if Instant::now() < until {
                        return Ok(0);
                    }
                    self.paused_until = None;
                    self.steps.pop_front();
                }
                Some(Step::Fail(message)) => {
                    return Err(DomainError::Read(message.clone()));
                }
            }
        }
    }
}

/// Backend double: one "window N" segment per window, optional failures,
/// optional latency, and a log of every call.
#[derive(Default)]
pub struct ScriptedTranscriber {
    calls: Mutex<Vec<u64>>,
    fail_on: Vec<u64>,
    delay: Option<Duration>,
    extra: Vec<TranscriptionSegment>,
}

impl ScriptedTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, sequence: u64) -> Self {
        self.fail_on.push(sequence);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Also return `segment` (window-relative) for every window.
    pub fn with_extra(mut self, segment: TranscriptionSegment) -> Self {
        self.extra.push(segment);
        self
    }

    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(
        &self,
        window: &AudioWindow,
    ) -> Result<Vec<TranscriptionSegment>, DomainError> {
        self.calls.lock().push(window.sequence());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on.contains(&window.sequence()) {
            return Err(DomainError::transcription("scripted failure"));
        }

        let mut segments = vec![TranscriptionSegment::new(
            format!("window {}", window.sequence()),
            0,
            10,
            0.9,
        )];
        segments.extend(self.extra.iter().cloned());
        Ok(segments)
    }

    fn capability(&self) -> BackendCapability {
        BackendCapability::unaccelerated()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn engine(
    config: &StreamConfig,
    transcriber: Arc<ScriptedTranscriber>,
) -> (TranscriptionEngine, Arc<PerformanceMonitor>) {
    let settings = RuntimeSettings::default();
    let monitor = Arc::new(PerformanceMonitor::new(settings.clone()));
    let engine = TranscriptionEngine::new(config, transcriber, monitor.clone(), settings)
        .expect("valid stream config");
    (engine, monitor)
}

pub fn audio(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
