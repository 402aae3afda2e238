use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::adapters::whisper_server::http_client;
use crate::adapters::{RemoteApiBackend, StubBackend, WhisperCliBackend, WhisperServerBackend};
use crate::domain::{
    resolve_capability, AccelerationConfig, AudioWindow, BackendCapability, BackendConfig,
    DomainError, GpuCapability, TranscriptionSegment,
};
use crate::ports::{CapabilitySource, Transcriber};

/// Strategy the dispatcher bound to, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Executable,
    LocalService,
    RemoteApi,
    Stub,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Executable => write!(f, "executable"),
            BackendKind::LocalService => write!(f, "local-service"),
            BackendKind::RemoteApi => write!(f, "remote-api"),
            BackendKind::Stub => write!(f, "stub"),
        }
    }
}

/// Binds once to the best available backend and forwards every call to it.
///
/// Immutable after [`BackendDispatcher::bind`]; share it behind an `Arc`.
pub struct BackendDispatcher {
    kind: BackendKind,
    backend: Arc<dyn Transcriber>,
}

impl BackendDispatcher {
    /// Probe strategies in order (local executable, local service, remote
    /// API, stub) and keep the first usable one.
    pub async fn bind(
        config: &BackendConfig,
        acceleration: &AccelerationConfig,
        capability_source: Arc<dyn CapabilitySource>,
    ) -> Result<Self, DomainError> {
        let endpoints = config.parsed_endpoints()?;
        let capability = Self::detect_capability(acceleration, capability_source).await;

        if let Some(backend) = Self::probe_executable(config, capability) {
            return Ok(Self::bound(BackendKind::Executable, Arc::new(backend)));
        }

        let client = http_client(Duration::from_millis(config.request_timeout_ms))?;
        let health_timeout = Duration::from_millis(config.health_timeout_ms);
        for endpoint in endpoints {
            if WhisperServerBackend::is_healthy(&client, &endpoint, health_timeout).await {
                let backend = WhisperServerBackend::new(
                    client,
                    endpoint,
                    config.language_hint().map(str::to_string),
                    capability,
                );
                return Ok(Self::bound(BackendKind::LocalService, Arc::new(backend)));
            }
        }
        debug!("No local transcription service answered");

        if let Some(api_key) = RemoteApiBackend::credential(&config.api_key_env) {
            let backend = RemoteApiBackend::new(
                client,
                config.parsed_api_url()?,
                api_key,
                config.api_model.clone(),
                config.language_hint().map(str::to_string),
            );
            return Ok(Self::bound(BackendKind::RemoteApi, Arc::new(backend)));
        }
        debug!(env = %config.api_key_env, "No remote API credential");

        if config.allow_stub {
            return Ok(Self::bound(BackendKind::Stub, Arc::new(StubBackend::new())));
        }

        Err(DomainError::BackendBind(
            "no executable, service or API credential found and the stub is disabled"
                .to_string(),
        ))
    }

    /// Resolve the execution mode, querying the GPU on the blocking pool only
    /// when auto-detection needs it.
    async fn detect_capability(
        acceleration: &AccelerationConfig,
        capability_source: Arc<dyn CapabilitySource>,
    ) -> BackendCapability {
        if !(acceleration.enabled && acceleration.auto_detect) {
            return resolve_capability(acceleration, GpuCapability::unavailable);
        }

        let gpu = match tokio::task::spawn_blocking(move || capability_source.query()).await {
            Ok(gpu) => gpu,
            Err(e) => {
                warn!(error = %e, "GPU capability query failed, running unaccelerated");
                GpuCapability::unavailable()
            }
        };
        resolve_capability(acceleration, move || gpu)
    }

    fn probe_executable(
        config: &BackendConfig,
        capability: BackendCapability,
    ) -> Option<WhisperCliBackend> {
        let Some(executable) = WhisperCliBackend::locate(&config.executable_candidates) else {
            debug!("No whisper CLI executable found");
            return None;
        };

        if !Path::new(&config.model_path).is_file() {
            warn!(
                executable = ?executable,
                model = %config.model_path,
                "Whisper CLI found but model file is missing, skipping"
            );
            return None;
        }

        Some(WhisperCliBackend::new(executable, config, capability))
    }

    /// Wrap an already constructed backend.
    pub fn from_backend(kind: BackendKind, backend: Arc<dyn Transcriber>) -> Self {
        Self::bound(kind, backend)
    }

    fn bound(kind: BackendKind, backend: Arc<dyn Transcriber>) -> Self {
        info!(
            kind = %kind,
            backend = backend.name(),
            capability = %backend.capability(),
            "Transcription backend bound"
        );
        Self { kind, backend }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }
}

#[async_trait]
impl Transcriber for BackendDispatcher {
    async fn transcribe(
        &self,
        window: &AudioWindow,
    ) -> Result<Vec<TranscriptionSegment>, DomainError> {
        self.backend.transcribe(window).await
    }

    fn capability(&self) -> BackendCapability {
        self.backend.capability()
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use std::thread::ThreadId;

    use parking_lot::Mutex;

    use super::*;
    use crate::adapters::test_http::{spawn_responder, CannedResponse};

    struct FixedCapability(GpuCapability);

    impl CapabilitySource for FixedCapability {
        fn query(&self) -> GpuCapability {
            self.0.clone()
        }
    }

    /// Records which threads queried it.
    #[derive(Default)]
    struct RecordingCapability {
        threads: Mutex<Vec<ThreadId>>,
    }

    impl CapabilitySource for RecordingCapability {
        fn query(&self) -> GpuCapability {
            self.threads.lock().push(std::thread::current().id());
            GpuCapability::unavailable()
        }
    }

    fn no_gpu() -> Arc<dyn CapabilitySource> {
        Arc::new(FixedCapability(GpuCapability::unavailable()))
    }

    fn one_gpu() -> Arc<dyn CapabilitySource> {
        Arc::new(FixedCapability(GpuCapability {
            available: true,
            device_count: 1,
            device_name: "Test GPU".to_string(),
            driver_version: "1.0".to_string(),
        }))
    }

    async fn bind(
        config: &BackendConfig,
        gpu: Arc<dyn CapabilitySource>,
    ) -> Result<BackendDispatcher, DomainError> {
        BackendDispatcher::bind(config, &AccelerationConfig::default(), gpu).await
    }

    /// Nothing discoverable: no executables, no endpoints, no credential.
    fn bare_config() -> BackendConfig {
        BackendConfig {
            executable_candidates: Vec::new(),
            service_endpoints: Vec::new(),
            api_key_env: "LIVESCRIBE_TEST_NEVER_SET".to_string(),
            health_timeout_ms: 500,
            ..BackendConfig::default()
        }
    }

    fn fake_install(dir: &Path) -> BackendConfig {
        let executable = dir.join("whisper-cli");
        let model = dir.join("ggml-tiny.bin");
        std::fs::write(&executable, b"").unwrap();
        std::fs::write(&model, b"").unwrap();

        BackendConfig {
            executable_candidates: vec![executable.to_string_lossy().to_string()],
            model_path: model.to_string_lossy().to_string(),
            ..bare_config()
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_stub() {
        let dispatcher = bind(&bare_config(), no_gpu()).await.unwrap();

        assert_eq!(dispatcher.kind(), BackendKind::Stub);
        assert_eq!(dispatcher.capability(), BackendCapability::unaccelerated());
        assert_eq!(dispatcher.name(), "stub");
    }

    #[tokio::test]
    async fn test_bind_error_without_stub() {
        let config = BackendConfig {
            allow_stub: false,
            ..bare_config()
        };
        let result = bind(&config, no_gpu()).await;

        assert!(matches!(result, Err(DomainError::BackendBind(_))));
    }

    #[tokio::test]
    async fn test_executable_wins_and_gets_gpu() {
        let dir = tempfile::tempdir().unwrap();
        let (endpoint, _requests) = spawn_responder(vec![CannedResponse::ok("ok")]).await;
        let config = BackendConfig {
            service_endpoints: vec![endpoint.to_string()],
            ..fake_install(dir.path())
        };

        let dispatcher = bind(&config, one_gpu()).await.unwrap();

        assert_eq!(dispatcher.kind(), BackendKind::Executable);
        assert_eq!(dispatcher.capability(), BackendCapability::accelerated(0));
    }

    #[tokio::test]
    async fn test_capability_query_runs_off_the_runtime_thread() {
        let source = Arc::new(RecordingCapability::default());

        bind(&bare_config(), source.clone()).await.unwrap();

        let threads = source.threads.lock().clone();
        assert_eq!(threads.len(), 1);
        assert_ne!(threads[0], std::thread::current().id());
    }

    #[tokio::test]
    async fn test_disabled_acceleration_skips_capability_query() {
        let source = Arc::new(RecordingCapability::default());
        let acceleration = AccelerationConfig {
            enabled: false,
            ..AccelerationConfig::default()
        };

        BackendDispatcher::bind(&bare_config(), &acceleration, source.clone())
            .await
            .unwrap();

        assert!(source.threads.lock().is_empty());
    }

    #[tokio::test]
    async fn test_executable_without_model_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = BackendConfig {
            model_path: dir.path().join("missing.bin").to_string_lossy().to_string(),
            ..fake_install(dir.path())
        };

        let dispatcher = bind(&config, no_gpu()).await.unwrap();

        assert_eq!(dispatcher.kind(), BackendKind::Stub);
    }

    #[tokio::test]
    async fn test_first_healthy_service_wins() {
        let (sick, _a) = spawn_responder(vec![CannedResponse::status(503, "loading")]).await;
        let (healthy, _b) = spawn_responder(vec![CannedResponse::ok("{\"status\":\"ok\"}")]).await;
        let config = BackendConfig {
            service_endpoints: vec![sick.to_string(), healthy.to_string()],
            ..bare_config()
        };

        let dispatcher = bind(&config, no_gpu()).await.unwrap();

        assert_eq!(dispatcher.kind(), BackendKind::LocalService);
        assert_eq!(dispatcher.name(), "whisper-server");
    }

    #[tokio::test]
    async fn test_remote_api_with_credential() {
        let env_var = "LIVESCRIBE_TEST_DISPATCHER_KEY";
        std::env::set_var(env_var, "sk-test");
        let config = BackendConfig {
            api_key_env: env_var.to_string(),
            ..bare_config()
        };

        let dispatcher = bind(&config, one_gpu()).await.unwrap();
        std::env::remove_var(env_var);

        assert_eq!(dispatcher.kind(), BackendKind::RemoteApi);
        // Remote execution never reports local acceleration.
        assert_eq!(dispatcher.capability(), BackendCapability::unaccelerated());
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_config_error() {
        let config = BackendConfig {
            service_endpoints: vec!["::::".to_string()],
            ..bare_config()
        };
        let result = bind(&config, no_gpu()).await;

        assert!(matches!(result, Err(DomainError::Config(_))));
    }
}
