use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::app::cancel::CancelToken;
use crate::app::performance::PerformanceMonitor;
use crate::app::settings::RuntimeSettings;
use crate::domain::{
    AudioWindow, DomainError, StreamConfig, TranscriptionSegment, WindowGeometry,
};
use crate::ports::{AudioSource, Transcriber};

/// How long an idle engine sleeps between reads of a drained source.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Segments wait here until the consumer takes them.
const OUTPUT_CAPACITY: usize = 1;

/// Why the engine task stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The source stayed drained for the configured timeout.
    IdleTimeout,
    Cancelled,
    SourceError(String),
    /// Nobody is listening for segments any more.
    ReceiverClosed,
    /// The task panicked.
    Fault(String),
}

/// Final report of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub windows_dispatched: u64,
    pub failed_windows: u64,
    pub segments_emitted: u64,
    pub segments_rejected: u64,
    pub idle_entries: u64,
    pub recoveries: u64,
    pub exit: ExitReason,
}

#[derive(Debug, Default)]
struct Counters {
    windows_dispatched: u64,
    failed_windows: u64,
    segments_emitted: u64,
    segments_rejected: u64,
    idle_entries: u64,
    recoveries: u64,
}

impl Counters {
    fn into_summary(self, exit: ExitReason) -> RunSummary {
        RunSummary {
            windows_dispatched: self.windows_dispatched,
            failed_windows: self.failed_windows,
            segments_emitted: self.segments_emitted,
            segments_rejected: self.segments_rejected,
            idle_entries: self.idle_entries,
            recoveries: self.recoveries,
            exit,
        }
    }
}

/// Slices an audio stream into overlapping windows and transcribes them.
///
/// Construction validates the window geometry; [`TranscriptionEngine::start`]
/// moves the engine onto its own task.
pub struct TranscriptionEngine {
    geometry: WindowGeometry,
    timeout: Duration,
    transcriber: Arc<dyn Transcriber>,
    monitor: Arc<PerformanceMonitor>,
    settings: RuntimeSettings,
}

impl TranscriptionEngine {
    pub fn new(
        config: &StreamConfig,
        transcriber: Arc<dyn Transcriber>,
        monitor: Arc<PerformanceMonitor>,
        settings: RuntimeSettings,
    ) -> Result<Self, DomainError> {
        let geometry = WindowGeometry::from_config(config)?;
        let timeout = config.idle_timeout()?;

        info!(
            window_bytes = geometry.window_size,
            overlap_bytes = geometry.overlap_size,
            step_bytes = geometry.step_size,
            timeout_ms = timeout.as_millis() as u64,
            backend = transcriber.name(),
            "TranscriptionEngine created"
        );

        Ok(Self {
            geometry,
            timeout,
            transcriber,
            monitor,
            settings,
        })
    }

    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    /// Spawn the engine task reading from `source`.
    ///
    /// The returned handle yields segments in source order and closes when
    /// the task ends, whatever the reason.
    pub fn start<S>(self, source: S, cancel: CancelToken) -> EngineHandle
    where
        S: AudioSource + 'static,
    {
        let (tx, rx) = mpsc::channel(OUTPUT_CAPACITY);

        let mut worker = Worker {
            geometry: self.geometry,
            timeout: self.timeout,
            transcriber: self.transcriber,
            monitor: self.monitor,
            settings: self.settings,
            source,
            cancel,
            tx,
            counters: Counters::default(),
            chunk_count: 0,
            total_read: 0,
            last_activity: Instant::now(),
            idle: false,
        };

        let task = tokio::spawn(async move {
            let exit = match AssertUnwindSafe(worker.run()).catch_unwind().await {
                Ok(exit) => exit,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(error = %message, "Transcription engine faulted");
                    ExitReason::Fault(message)
                }
            };
            worker.finish(exit)
        });

        EngineHandle { segments: rx, task }
    }
}

/// Consumer side of a running engine.
pub struct EngineHandle {
    segments: mpsc::Receiver<TranscriptionSegment>,
    task: JoinHandle<RunSummary>,
}

impl EngineHandle {
    /// Next segment, or `None` once the engine has stopped.
    pub async fn recv(&mut self) -> Option<TranscriptionSegment> {
        self.segments.recv().await
    }

    /// Stop listening and wait for the run summary.
    ///
    /// Segments not yet received are dropped; an engine still producing
    /// stops with [`ExitReason::ReceiverClosed`].
    pub async fn join(self) -> RunSummary {
        let EngineHandle { segments, task } = self;
        drop(segments);

        match task.await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, "Transcription engine task failed");
                Counters::default().into_summary(ExitReason::Fault(e.to_string()))
            }
        }
    }
}

struct Worker<S> {
    geometry: WindowGeometry,
    timeout: Duration,
    transcriber: Arc<dyn Transcriber>,
    monitor: Arc<PerformanceMonitor>,
    settings: RuntimeSettings,
    source: S,
    cancel: CancelToken,
    tx: mpsc::Sender<TranscriptionSegment>,
    counters: Counters,
    chunk_count: u64,
    total_read: u64,
    last_activity: Instant,
    idle: bool,
}

impl<S: AudioSource> Worker<S> {
    async fn run(&mut self) -> ExitReason {
        let window_size = self.geometry.window_size;
        let overlap_size = self.geometry.overlap_size;
        let mut carry: Zeroizing<Vec<u8>> = Zeroizing::new(Vec::with_capacity(overlap_size));

        loop {
            if self.cancel.is_cancelled() {
                return ExitReason::Cancelled;
            }

            // Every window is topped up to window_size: the first needs a
            // whole window, later ones only what the carry does not cover.
            let needed = window_size - carry.len();
            let mut buffer = Zeroizing::new(Vec::with_capacity(window_size));
            buffer.extend_from_slice(&carry);
            buffer.resize(window_size, 0);

            let filled = match self.fill(&mut buffer[carry.len()..]).await {
                Ok(filled) => filled,
                Err(exit) => return exit,
            };

            if filled == needed {
                if self.idle {
                    self.idle = false;
                    self.counters.recoveries += 1;
                    info!(window = self.chunk_count, "Audio source recovered, resuming");
                }

                let window = self.next_window(std::mem::take(&mut *buffer), false);
                carry = tail(&window, overlap_size);
                if let Err(exit) = self.dispatch(window).await {
                    return exit;
                }
                continue;
            }

            if filled > 0 {
                buffer.truncate(carry.len() + filled);
                let window = self.next_window(std::mem::take(&mut *buffer), true);
                carry = tail(&window, overlap_size);
                if let Err(exit) = self.dispatch(window).await {
                    return exit;
                }
            }

            if !self.idle {
                self.idle = true;
                self.counters.idle_entries += 1;
                info!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    carried_bytes = carry.len(),
                    "Audio source drained, waiting for more data"
                );
            }

            if self.last_activity.elapsed() >= self.timeout {
                info!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Idle timeout reached"
                );
                return ExitReason::IdleTimeout;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return ExitReason::Cancelled,
                _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
            }
        }
    }

    /// Read until `buf` is full or the source reports end-of-data.
    async fn fill(&mut self, buf: &mut [u8]) -> Result<usize, ExitReason> {
        let mut filled = 0;

        while filled < buf.len() {
            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ExitReason::Cancelled),
                read = self.source.read(&mut buf[filled..]) => read,
            };

            match read {
                Ok(0) => break,
                Ok(n) => {
                    filled += n.min(buf.len() - filled);
                    self.last_activity = Instant::now();
                }
                Err(e) => {
                    error!(error = %e, read_bytes = self.total_read, "Audio source failed");
                    return Err(ExitReason::SourceError(e.to_string()));
                }
            }
        }

        self.total_read += filled as u64;
        Ok(filled)
    }

    fn next_window(&mut self, bytes: Vec<u8>, is_final: bool) -> AudioWindow {
        let start_byte = self.total_read.saturating_sub(bytes.len() as u64);
        let offset_ms = self.geometry.bytes_to_ms(start_byte);
        let sequence = self.chunk_count;
        self.chunk_count += 1;

        AudioWindow::new(bytes, sequence, offset_ms, is_final, self.geometry)
    }

    async fn dispatch(&mut self, window: AudioWindow) -> Result<(), ExitReason> {
        if self.cancel.is_cancelled() {
            return Err(ExitReason::Cancelled);
        }

        self.counters.windows_dispatched += 1;
        let capability = self.transcriber.capability();
        let sample = self.monitor.start_sample(
            window.len(),
            capability.uses_acceleration,
            capability.device_id,
        );

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ExitReason::Cancelled),
            result = self.transcriber.transcribe(&window) => result,
        };
        self.monitor.end_sample(sample);

        let segments = match result {
            Ok(segments) => segments,
            Err(e) => {
                let e = e.for_window(window.sequence());
                error!(
                    window = window.sequence(),
                    bytes = window.len(),
                    error = %e,
                    "Window transcription failed, skipping"
                );
                self.counters.failed_windows += 1;
                return Ok(());
            }
        };

        if self.settings.debug() {
            info!(
                window = window.sequence(),
                offset_ms = window.offset_ms(),
                bytes = window.len(),
                is_final = window.is_final(),
                segments = segments.len(),
                "Window transcribed"
            );
        } else {
            debug!(window = window.sequence(), segments = segments.len(), "Window transcribed");
        }

        for segment in segments {
            let segment = segment.shifted(window.offset_ms());
            if let Err(e) = segment.validate() {
                warn!(window = window.sequence(), error = %e, "Dropping invalid segment");
                self.counters.segments_rejected += 1;
                continue;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ExitReason::Cancelled),
                sent = self.tx.send(segment) => {
                    if sent.is_err() {
                        warn!("Segment receiver closed, stopping");
                        return Err(ExitReason::ReceiverClosed);
                    }
                }
            }
            self.counters.segments_emitted += 1;
        }

        Ok(())
    }

    /// Drop the sender, closing the output channel, and report.
    fn finish(self, exit: ExitReason) -> RunSummary {
        let Worker {
            counters,
            total_read,
            tx,
            ..
        } = self;
        drop(tx);

        info!(
            exit = ?exit,
            windows = counters.windows_dispatched,
            failed = counters.failed_windows,
            segments = counters.segments_emitted,
            bytes_read = total_read,
            "Transcription engine stopped"
        );
        counters.into_summary(exit)
    }
}

/// Trailing `overlap` bytes of a window, or all of it when shorter.
fn tail(window: &AudioWindow, overlap: usize) -> Zeroizing<Vec<u8>> {
    let bytes = window.bytes();
    let keep = overlap.min(bytes.len());
    Zeroizing::new(bytes[bytes.len() - keep..].to_vec())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
