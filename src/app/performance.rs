use std::time::Instant;

use parking_lot::RwLock;
use tracing::info;

use crate::app::settings::RuntimeSettings;
use crate::domain::{AccelerationReport, AggregateMetrics, SampleRecord};

/// An in-flight backend invocation, opened by [`PerformanceMonitor::start_sample`].
#[derive(Debug)]
#[must_use = "a sample is only recorded when passed to end_sample"]
pub struct PerformanceSample {
    started: Instant,
    audio_bytes: u64,
    uses_acceleration: bool,
    device_id: u32,
}

/// Accumulates timing of backend invocations.
///
/// The aggregate sits behind one read/write lock: the engine task writes,
/// any number of readers take snapshots.
pub struct PerformanceMonitor {
    metrics: RwLock<AggregateMetrics>,
    settings: RuntimeSettings,
}

impl PerformanceMonitor {
    pub fn new(settings: RuntimeSettings) -> Self {
        Self {
            metrics: RwLock::new(AggregateMetrics::default()),
            settings,
        }
    }

    pub fn start_sample(
        &self,
        audio_bytes: usize,
        uses_acceleration: bool,
        device_id: u32,
    ) -> PerformanceSample {
        PerformanceSample {
            started: Instant::now(),
            audio_bytes: audio_bytes as u64,
            uses_acceleration,
            device_id,
        }
    }

    pub fn end_sample(&self, sample: PerformanceSample) {
        let record = SampleRecord {
            audio_bytes: sample.audio_bytes,
            uses_acceleration: sample.uses_acceleration,
            device_id: sample.device_id,
            processing: sample.started.elapsed(),
        };

        let (invocations, avg) = {
            let mut metrics = self.metrics.write();
            metrics.record(record);
            (metrics.total_invocations, metrics.avg_processing)
        };

        if self.settings.verbose_metrics() {
            info!(
                audio_bytes = record.audio_bytes,
                processing_ms = record.processing.as_millis() as u64,
                uses_acceleration = record.uses_acceleration,
                device_id = record.device_id,
                invocations,
                avg_ms = avg.as_millis() as u64,
                "Backend invocation timed"
            );
        }
    }

    /// Copy of the current totals.
    pub fn snapshot(&self) -> AggregateMetrics {
        self.metrics.read().clone()
    }

    pub fn reset(&self) {
        *self.metrics.write() = AggregateMetrics::default();
        info!("Performance metrics reset");
    }

    /// Estimated accelerated vs unaccelerated cost.
    ///
    /// Windows run on one path only, so this compares different audio and
    /// may extrapolate a side that never ran. See
    /// [`AggregateMetrics::acceleration_report`].
    pub fn compare_accelerated_vs_unaccelerated(&self) -> AccelerationReport {
        self.metrics.read().acceleration_report()
    }
}
