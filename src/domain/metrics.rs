use std::time::Duration;

/// Multiplier used to extrapolate the missing side of an accelerated vs
/// unaccelerated comparison when only one side has been observed.
pub const ASSUMED_ACCELERATION_SPEEDUP: f64 = 4.0;

/// Figures of the most recent backend invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRecord {
    pub audio_bytes: u64,
    pub uses_acceleration: bool,
    pub device_id: u32,
    pub processing: Duration,
}

/// Running totals over every backend invocation since start or last reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateMetrics {
    pub total_invocations: u64,
    pub total_bytes: u64,
    pub total_processing: Duration,
    pub accelerated_count: u64,
    pub unaccelerated_count: u64,
    pub accelerated_bytes: u64,
    pub unaccelerated_bytes: u64,
    pub accelerated_processing: Duration,
    pub unaccelerated_processing: Duration,
    pub avg_processing: Duration,
    pub min_processing: Option<Duration>,
    pub max_processing: Option<Duration>,
    pub last_sample: Option<SampleRecord>,
}

impl AggregateMetrics {
    /// Fold one finished invocation into the totals.
    pub fn record(&mut self, sample: SampleRecord) {
        self.total_invocations += 1;
        self.total_bytes += sample.audio_bytes;
        self.total_processing += sample.processing;

        if sample.uses_acceleration {
            self.accelerated_count += 1;
            self.accelerated_bytes += sample.audio_bytes;
            self.accelerated_processing += sample.processing;
        } else {
            self.unaccelerated_count += 1;
            self.unaccelerated_bytes += sample.audio_bytes;
            self.unaccelerated_processing += sample.processing;
        }

        self.min_processing = Some(
            self.min_processing
                .map_or(sample.processing, |min| min.min(sample.processing)),
        );
        self.max_processing = Some(
            self.max_processing
                .map_or(sample.processing, |max| max.max(sample.processing)),
        );
        self.avg_processing = self.total_processing / self.total_invocations as u32;
        self.last_sample = Some(sample);
    }

    /// Seconds of processing per megabyte of audio, accelerated side.
    fn accelerated_cost(&self) -> Option<f64> {
        cost_per_mb(self.accelerated_processing, self.accelerated_bytes)
    }

    /// Seconds of processing per megabyte of audio, unaccelerated side.
    fn unaccelerated_cost(&self) -> Option<f64> {
        cost_per_mb(self.unaccelerated_processing, self.unaccelerated_bytes)
    }

    /// Estimate how the two execution modes compare.
    ///
    /// This is never an A/B measurement: each window runs on exactly one path,
    /// so the two sides cover different audio. When only one side has data
    /// the other is extrapolated with [`ASSUMED_ACCELERATION_SPEEDUP`].
    pub fn acceleration_report(&self) -> AccelerationReport {
        let (accelerated, unaccelerated, basis) =
            match (self.accelerated_cost(), self.unaccelerated_cost()) {
                (Some(gpu), Some(cpu)) => (gpu, cpu, ComparisonBasis::Observed),
                (Some(gpu), None) => (
                    gpu,
                    gpu * ASSUMED_ACCELERATION_SPEEDUP,
                    ComparisonBasis::Extrapolated,
                ),
                (None, Some(cpu)) => (
                    cpu / ASSUMED_ACCELERATION_SPEEDUP,
                    cpu,
                    ComparisonBasis::Extrapolated,
                ),
                (None, None) => return AccelerationReport::no_data(),
            };

        let speedup = if accelerated > 0.0 {
            Some(unaccelerated / accelerated)
        } else {
            None
        };

        AccelerationReport {
            basis,
            accelerated_secs_per_mb: Some(accelerated),
            unaccelerated_secs_per_mb: Some(unaccelerated),
            estimated_speedup: speedup,
            accelerated_samples: self.accelerated_count,
            unaccelerated_samples: self.unaccelerated_count,
        }
    }
}

fn cost_per_mb(processing: Duration, bytes: u64) -> Option<f64> {
    if bytes == 0 {
        return None;
    }
    Some(processing.as_secs_f64() / (bytes as f64 / 1_000_000.0))
}

/// Where the numbers of an [`AccelerationReport`] come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonBasis {
    /// Both modes have run, on different windows.
    Observed,
    /// One mode is projected from the other with a fixed factor.
    Extrapolated,
    NoData,
}

/// Estimated accelerated vs unaccelerated cost.
#[derive(Debug, Clone, PartialEq)]
pub struct AccelerationReport {
    pub basis: ComparisonBasis,
    pub accelerated_secs_per_mb: Option<f64>,
    pub unaccelerated_secs_per_mb: Option<f64>,
    /// Unaccelerated cost divided by accelerated cost.
    pub estimated_speedup: Option<f64>,
    pub accelerated_samples: u64,
    pub unaccelerated_samples: u64,
}

impl AccelerationReport {
    fn no_data() -> Self {
        Self {
            basis: ComparisonBasis::NoData,
            accelerated_secs_per_mb: None,
            unaccelerated_secs_per_mb: None,
            estimated_speedup: None,
            accelerated_samples: 0,
            unaccelerated_samples: 0,
        }
    }
}
