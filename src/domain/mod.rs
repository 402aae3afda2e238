pub mod audio;
pub mod config;
pub mod error;
pub mod hardware;
pub mod metrics;
pub mod transcription;

pub use audio::{AudioWindow, WindowGeometry, MAX_BYTES_PER_SAMPLE};
pub use config::{
    AccelerationConfig, AppConfig, BackendConfig, LoggingConfig, RuntimeConfig, StreamConfig,
};
pub use error::DomainError;
pub use hardware::{resolve_capability, BackendCapability, GpuCapability};
pub use metrics::{AccelerationReport, AggregateMetrics, ComparisonBasis, SampleRecord};
pub use transcription::{TranscriptionSegment, DEFAULT_CONFIDENCE, STUB_CONFIDENCE};
