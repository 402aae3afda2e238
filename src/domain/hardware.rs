use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::config::AccelerationConfig;

/// What the hardware capability source reports about GPU acceleration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuCapability {
    pub available: bool,
    pub device_count: u32,
    pub device_name: String,
    pub driver_version: String,
}

impl GpuCapability {
    /// Answer used whenever probing fails.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Pick the device to run on: the requested one when it exists,
    /// otherwise the first device.
    pub fn optimal_device(&self, requested: u32) -> u32 {
        if requested < self.device_count {
            requested
        } else {
            0
        }
    }
}

/// Execution mode bound by the dispatcher. Fixed for the engine's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCapability {
    pub uses_acceleration: bool,
    pub device_id: u32,
}

impl BackendCapability {
    pub fn unaccelerated() -> Self {
        Self::default()
    }

    pub fn accelerated(device_id: u32) -> Self {
        Self {
            uses_acceleration: true,
            device_id,
        }
    }
}

impl std::fmt::Display for BackendCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.uses_acceleration {
            write!(f, "gpu:{}", self.device_id)
        } else {
            write!(f, "cpu")
        }
    }
}

/// Decide the execution mode from configuration.
///
/// `probe` is only called when auto-detection is on. A forced request is
/// honoured without verification; failures then surface per invocation.
pub fn resolve_capability<F>(config: &AccelerationConfig, probe: F) -> BackendCapability
where
    F: FnOnce() -> GpuCapability,
{
    if !config.enabled {
        info!("Acceleration disabled by configuration");
        return BackendCapability::unaccelerated();
    }

    if !config.auto_detect {
        warn!(
            device_id = config.device_id,
            "Acceleration forced by configuration without capability check"
        );
        return BackendCapability::accelerated(config.device_id);
    }

    let gpu = probe();
    if !gpu.available {
        info!("No GPU capability detected, running unaccelerated");
        return BackendCapability::unaccelerated();
    }

    let device_id = gpu.optimal_device(config.device_id);
    if device_id != config.device_id {
        warn!(
            requested = config.device_id,
            selected = device_id,
            device_count = gpu.device_count,
            "Requested GPU device does not exist"
        );
    }
    info!(
        device_id,
        device_name = %gpu.device_name,
        driver_version = %gpu.driver_version,
        "GPU acceleration enabled"
    );
    BackendCapability::accelerated(device_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpu(count: u32) -> GpuCapability {
        GpuCapability {
            available: count > 0,
            device_count: count,
            device_name: "Test GPU".to_string(),
            driver_version: "550.00".to_string(),
        }
    }

    #[test]
    fn test_optimal_device() {
        assert_eq!(gpu(2).optimal_device(1), 1);
        assert_eq!(gpu(2).optimal_device(5), 0);
        assert_eq!(GpuCapability::unavailable().optimal_device(0), 0);
    }

    #[test]
    fn test_disabled_never_probes() {
        let config = AccelerationConfig {
            enabled: false,
            ..AccelerationConfig::default()
        };
        let capability = resolve_capability(&config, || panic!("probe must not run"));
        assert_eq!(capability, BackendCapability::unaccelerated());
    }

    #[test]
    fn test_auto_detect_with_gpu() {
        let config = AccelerationConfig {
            device_id: 1,
            ..AccelerationConfig::default()
        };
        assert_eq!(
            resolve_capability(&config, || gpu(2)),
            BackendCapability::accelerated(1)
        );
    }

    #[test]
    fn test_auto_detect_without_gpu() {
        let config = AccelerationConfig::default();
        assert_eq!(
            resolve_capability(&config, GpuCapability::unavailable),
            BackendCapability::unaccelerated()
        );
    }

    #[test]
    fn test_auto_detect_bad_device_falls_back_to_first() {
        let config = AccelerationConfig {
            device_id: 3,
            ..AccelerationConfig::default()
        };
        assert_eq!(
            resolve_capability(&config, || gpu(1)),
            BackendCapability::accelerated(0)
        );
    }

    #[test]
    fn test_forced_skips_probe() {
        let config = AccelerationConfig {
            enabled: true,
            auto_detect: false,
            device_id: 2,
        };
        let capability = resolve_capability(&config, || panic!("probe must not run"));
        assert_eq!(capability, BackendCapability::accelerated(2));
    }

    #[test]
    fn test_capability_display() {
        assert_eq!(BackendCapability::accelerated(1).to_string(), "gpu:1");
        assert_eq!(BackendCapability::unaccelerated().to_string(), "cpu");
    }
}
