use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::domain::RuntimeConfig;

/// Shared handle to flags that may change while a stream is running.
///
/// Clones share state. Readers load the flags on every use instead of caching
/// them, so a toggle takes effect on the next window.
#[derive(Debug, Clone, Default)]
pub struct RuntimeSettings {
    inner: Arc<Flags>,
}

#[derive(Debug, Default)]
struct Flags {
    debug: AtomicBool,
    verbose_metrics: AtomicBool,
}

impl RuntimeSettings {
    pub fn new(config: &RuntimeConfig) -> Self {
        let settings = Self::default();
        settings.inner.debug.store(config.debug, Ordering::SeqCst);
        settings
            .inner
            .verbose_metrics
            .store(config.verbose_metrics, Ordering::SeqCst);
        settings
    }

    pub fn debug(&self) -> bool {
        self.inner.debug.load(Ordering::SeqCst)
    }

    pub fn set_debug(&self, enabled: bool) {
        let previous = self.inner.debug.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!(enabled, "Debug mode changed");
        }
    }

    pub fn verbose_metrics(&self) -> bool {
        self.inner.verbose_metrics.load(Ordering::SeqCst)
    }

    pub fn set_verbose_metrics(&self, enabled: bool) {
        let previous = self.inner.verbose_metrics.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!(enabled, "Verbose metrics changed");
        }
    }
}
