use crate::domain::GpuCapability;

/// Port for hardware capability queries.
///
/// Implementations must not fail: when probing goes wrong they answer
/// [`GpuCapability::unavailable`].
pub trait CapabilitySource: Send + Sync {
    /// Report GPU availability. May be cached after the first call.
    ///
    /// May block on external tools; async callers run it on the blocking pool.
    fn query(&self) -> GpuCapability;
}
