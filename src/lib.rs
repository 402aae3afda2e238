#![forbid(unsafe_code)]

//! Live transcription of raw PCM streams.
//!
//! Audio is cut into overlapping windows, each window goes to whichever
//! speech backend was found at startup, and the resulting segments come out
//! in stream order with stream-relative timestamps.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use app::{
    run_pipeline, AppController, BackendDispatcher, BackendKind, CancelToken, EngineHandle,
    ExitReason, PerformanceMonitor, RunSummary, RuntimeSettings, TranscriptionEngine,
};
pub use domain::{AudioWindow, DomainError, StreamConfig, TranscriptionSegment};
