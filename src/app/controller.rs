use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::TomlConfigStore;
use crate::app::cancel::CancelToken;
use crate::app::dispatcher::BackendDispatcher;
use crate::app::engine::{RunSummary, TranscriptionEngine};
use crate::app::performance::PerformanceMonitor;
use crate::app::settings::RuntimeSettings;
use crate::domain::{AppConfig, DomainError, WindowGeometry};
use crate::infrastructure::init_logging;
use crate::ports::{AudioSource, CapabilitySource, ConfigStore, SegmentSink};

/// Application controller that wires configuration, logging, backend
/// selection and the engine together.
pub struct AppController {
    config: RwLock<AppConfig>,
    config_store: Arc<TomlConfigStore>,
    settings: RuntimeSettings,
    monitor: Arc<PerformanceMonitor>,
    _log_guard: Option<WorkerGuard>,
}

impl AppController {
    /// Load configuration from `config_store` and initialize logging.
    pub fn new(config_store: TomlConfigStore) -> Result<Self, DomainError> {
        let config_store = Arc::new(config_store);
        let config = config_store.load()?;

        let log_guard = init_logging(
            &config_store.logs_dir(),
            &config.logging.level,
            config.logging.file_logging,
        )?;

        info!(version = env!("CARGO_PKG_VERSION"), "livescribe starting up");

        let settings = RuntimeSettings::new(&config.runtime);
        let monitor = Arc::new(PerformanceMonitor::new(settings.clone()));

        info!(
            config_path = ?config_store.config_path(),
            debug = settings.debug(),
            "AppController initialized"
        );

        Ok(Self {
            config: RwLock::new(config),
            config_store,
            settings,
            monitor,
            _log_guard: log_guard,
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Validate, persist and apply a new configuration.
    pub fn update_config(&self, config: AppConfig) -> Result<(), DomainError> {
        WindowGeometry::from_config(&config.stream)?;
        self.config_store.save(&config)?;
        self.apply(config);

        info!("Configuration updated");
        Ok(())
    }

    /// Adjust the in-memory configuration without saving it, e.g. from
    /// command-line flags.
    pub fn override_config<F>(&self, edit: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config();
        edit(&mut config);
        WindowGeometry::from_config(&config.stream)?;
        self.apply(config);
        Ok(())
    }

    fn apply(&self, config: AppConfig) {
        self.settings.set_debug(config.runtime.debug);
        self.settings.set_verbose_metrics(config.runtime.verbose_metrics);
        *self.config.write() = config;
    }

    /// Handle to the flags the running engine reads on every window.
    pub fn settings(&self) -> RuntimeSettings {
        self.settings.clone()
    }

    pub fn monitor(&self) -> Arc<PerformanceMonitor> {
        Arc::clone(&self.monitor)
    }

    /// Bind a backend and build an engine from the current configuration.
    pub async fn build_engine(
        &self,
        capability_source: Arc<dyn CapabilitySource>,
    ) -> Result<TranscriptionEngine, DomainError> {
        let config = self.config();
        let dispatcher =
            BackendDispatcher::bind(&config.backend, &config.acceleration, capability_source)
                .await?;

        TranscriptionEngine::new(
            &config.stream,
            Arc::new(dispatcher),
            self.monitor(),
            self.settings(),
        )
    }

    /// Transcribe `source` into `sink` until the engine stops.
    pub async fn run<S, K>(
        &self,
        source: S,
        sink: &mut K,
        cancel: CancelToken,
        capability_source: Arc<dyn CapabilitySource>,
    ) -> Result<RunSummary, DomainError>
    where
        S: AudioSource + 'static,
        K: SegmentSink + ?Sized,
    {
        let engine = self.build_engine(capability_source).await?;
        run_pipeline(engine, source, sink, cancel).await
    }

    /// Log the run summary, metrics totals and acceleration estimate.
    pub fn report(&self, summary: &RunSummary) {
        info!(
            exit = ?summary.exit,
            windows = summary.windows_dispatched,
            failed_windows = summary.failed_windows,
            segments = summary.segments_emitted,
            rejected = summary.segments_rejected,
            idle_entries = summary.idle_entries,
            recoveries = summary.recoveries,
            "Run finished"
        );

        let metrics = self.monitor.snapshot();
        info!(
            invocations = metrics.total_invocations,
            audio_bytes = metrics.total_bytes,
            total_ms = metrics.total_processing.as_millis() as u64,
            avg_ms = metrics.avg_processing.as_millis() as u64,
            min_ms = metrics.min_processing.map(|d| d.as_millis() as u64),
            max_ms = metrics.max_processing.map(|d| d.as_millis() as u64),
            accelerated = metrics.accelerated_count,
            unaccelerated = metrics.unaccelerated_count,
            "Backend performance"
        );

        let report = self.monitor.compare_accelerated_vs_unaccelerated();
        info!(
            basis = ?report.basis,
            accelerated_secs_per_mb = report.accelerated_secs_per_mb,
            unaccelerated_secs_per_mb = report.unaccelerated_secs_per_mb,
            estimated_speedup = report.estimated_speedup,
            "Acceleration estimate (windows differ between modes)"
        );
    }

    /// Get the logs directory path.
    pub fn logs_dir(&self) -> PathBuf {
        self.config_store.logs_dir()
    }

    /// Get the config file path.
    pub fn config_path(&self) -> PathBuf {
        self.config_store.config_path()
    }
}

/// Start `engine` on `source` and pump its segments into `sink`.
///
/// Malformed segments are logged and skipped. Any other sink failure stops
/// the engine and is returned once it has shut down.
pub async fn run_pipeline<S, K>(
    engine: TranscriptionEngine,
    source: S,
    sink: &mut K,
    cancel: CancelToken,
) -> Result<RunSummary, DomainError>
where
    S: AudioSource + 'static,
    K: SegmentSink + ?Sized,
{
    let mut handle = engine.start(source, cancel);
    let mut failure = None;

    while let Some(segment) = handle.recv().await {
        match sink.accept(&segment) {
            Ok(()) => {}
            Err(DomainError::Validation(message)) => {
                warn!(error = %message, "Sink rejected segment");
            }
            Err(e) => {
                error!(error = %e, "Sink failed, stopping engine");
                failure = Some(e);
                break;
            }
        }
    }

    let summary = handle.join().await;
    if let Some(e) = failure {
        return Err(e);
    }

    sink.flush()?;
    Ok(summary)
}
