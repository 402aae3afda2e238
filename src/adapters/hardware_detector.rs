use std::process::Command;
use std::sync::OnceLock;

use tracing::{debug, info};

use crate::domain::GpuCapability;
use crate::ports::CapabilitySource;

/// GPU capability source backed by `nvidia-smi`.
///
/// The tool is run once; the answer is cached for the life of the probe.
/// Any failure (tool missing, non-zero exit, unparsable output) reads as
/// "no GPU".
pub struct NvidiaSmiProbe {
    program: String,
    capability: OnceLock<GpuCapability>,
}

impl NvidiaSmiProbe {
    pub fn new() -> Self {
        Self::with_program("nvidia-smi")
    }

    /// Use a different executable, e.g. an absolute path to `nvidia-smi`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            capability: OnceLock::new(),
        }
    }

    fn probe(&self) -> GpuCapability {
        let output = match Command::new(&self.program)
            .args(["--query-gpu=name,driver_version", "--format=csv,noheader"])
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                debug!(program = %self.program, error = %e, "GPU probe could not run");
                return GpuCapability::unavailable();
            }
        };

        if !output.status.success() {
            debug!(program = %self.program, status = ?output.status, "GPU probe failed");
            return GpuCapability::unavailable();
        }

        let capability = parse_query_output(&String::from_utf8_lossy(&output.stdout));
        info!(
            available = capability.available,
            device_count = capability.device_count,
            device_name = %capability.device_name,
            driver_version = %capability.driver_version,
            "GPU capability detected"
        );
        capability
    }
}

impl Default for NvidiaSmiProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilitySource for NvidiaSmiProbe {
    fn query(&self) -> GpuCapability {
        self.capability.get_or_init(|| self.probe()).clone()
    }
}

/// Parse `name, driver_version` CSV rows, one per device.
fn parse_query_output(stdout: &str) -> GpuCapability {
    let rows: Vec<(&str, &str)> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let (name, driver) = line.split_once(',')?;
            Some((name.trim(), driver.trim()))
        })
        .collect();

    match rows.first() {
        Some((name, driver)) => GpuCapability {
            available: true,
            device_count: rows.len() as u32,
            device_name: name.to_string(),
            driver_version: driver.to_string(),
        },
        None => GpuCapability::unavailable(),
    }
}
