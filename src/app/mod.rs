pub mod cancel;
pub mod controller;
pub mod dispatcher;
pub mod engine;
pub mod performance;
pub mod settings;

pub use cancel::CancelToken;
pub use controller::{run_pipeline, AppController};
pub use dispatcher::{BackendDispatcher, BackendKind};
pub use engine::{
    EngineHandle, ExitReason, RunSummary, TranscriptionEngine, IDLE_POLL_INTERVAL,
};
pub use performance::{PerformanceMonitor, PerformanceSample};
pub use settings::RuntimeSettings;
