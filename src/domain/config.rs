use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::error::DomainError;

/// Windowing parameters of the streaming engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Length of one window in seconds.
    pub chunk_duration_secs: f64,
    /// Trailing audio carried into the next window, in seconds.
    pub overlap_secs: f64,
    /// Longest tolerated source stall before the stream ends, in seconds.
    pub timeout_secs: f64,
    /// PCM sample rate in Hz.
    pub sample_rate: u32,
    /// Bytes per sample (1 = u8, 2 = s16le, 3 = s24le, 4 = f32le). Input is mono.
    pub bytes_per_sample: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_duration_secs: 5.0,
            overlap_secs: 0.5,
            timeout_secs: 30.0,
            sample_rate: 16_000,
            bytes_per_sample: 2,
        }
    }
}

impl StreamConfig {
    /// The idle timeout as a [`Duration`].
    ///
    /// Negative, non-finite or unrepresentably large values are a
    /// `DomainError::Config`.
    pub fn idle_timeout(&self) -> Result<Duration, DomainError> {
        Duration::try_from_secs_f64(self.timeout_secs).map_err(|e| {
            DomainError::Config(format!(
                "timeout_secs {} is invalid: {}",
                self.timeout_secs, e
            ))
        })
    }
}

/// Backend discovery and invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Candidate whisper.cpp CLI locations, probed in order. Bare names are
    /// looked up on `PATH`.
    pub executable_candidates: Vec<String>,
    /// ggml model used by the CLI backend.
    pub model_path: String,
    /// Language code passed to backends ("auto" to detect).
    pub language: String,
    /// CLI thread count (0 = available parallelism minus one).
    pub threads: u32,
    /// Candidate local whisper server base URLs, probed in order.
    pub service_endpoints: Vec<String>,
    /// Health check timeout per endpoint in milliseconds.
    pub health_timeout_ms: u64,
    /// Base URL of the OpenAI-compatible remote API.
    pub api_url: String,
    /// Model name sent to the remote API.
    pub api_model: String,
    /// Environment variable holding the remote API key.
    pub api_key_env: String,
    /// Per-request timeout for HTTP backends in milliseconds.
    pub request_timeout_ms: u64,
    /// Fall back to the stub backend when nothing else binds.
    pub allow_stub: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            executable_candidates: vec![
                "/usr/local/bin/whisper-cli".to_string(),
                "/usr/bin/whisper-cli".to_string(),
                "/opt/whisper.cpp/build/bin/whisper-cli".to_string(),
                "./whisper.cpp/build/bin/whisper-cli".to_string(),
                "whisper-cli".to_string(),
            ],
            model_path: "models/ggml-base.en.bin".to_string(),
            language: "auto".to_string(),
            threads: 0,
            service_endpoints: vec![
                "http://127.0.0.1:8080".to_string(),
                "http://127.0.0.1:8178".to_string(),
            ],
            health_timeout_ms: 1_500,
            api_url: "https://api.openai.com/v1".to_string(),
            api_model: "whisper-1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_ms: 60_000,
            allow_stub: true,
        }
    }
}

impl BackendConfig {
    /// Language to forward, or None for auto-detection.
    pub fn language_hint(&self) -> Option<&str> {
        match self.language.trim() {
            "" | "auto" => None,
            lang => Some(lang),
        }
    }

    /// Parse the configured service endpoints, failing on the first bad URL.
    pub fn parsed_endpoints(&self) -> Result<Vec<Url>, DomainError> {
        self.service_endpoints
            .iter()
            .map(|endpoint| {
                Url::parse(endpoint).map_err(|e| {
                    DomainError::Config(format!("invalid service endpoint '{}': {}", endpoint, e))
                })
            })
            .collect()
    }

    pub fn parsed_api_url(&self) -> Result<Url, DomainError> {
        Url::parse(&self.api_url)
            .map_err(|e| DomainError::Config(format!("invalid api_url '{}': {}", self.api_url, e)))
    }
}

/// GPU acceleration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelerationConfig {
    /// Request accelerated execution.
    pub enabled: bool,
    /// Verify the request against the hardware capability source. When false
    /// and `enabled` is true, acceleration is forced without verification.
    pub auto_detect: bool,
    /// Preferred device id.
    pub device_id: u32,
}

impl Default for AccelerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_detect: true,
            device_id: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
        }
    }
}

/// Initial values of the runtime-toggleable flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Per-window detail at info level.
    pub debug: bool,
    /// One structured log line per backend invocation.
    pub verbose_metrics: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub stream: StreamConfig,
    pub backend: BackendConfig,
    pub acceleration: AccelerationConfig,
    pub logging: LoggingConfig,
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }
}
