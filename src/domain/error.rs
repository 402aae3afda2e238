use thiserror::Error;

/// Domain-level errors for livescribe.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No transcription backend could be bound: {0}")]
    BackendBind(String),

    /// A single window failed to transcribe. `window` is filled in by the
    /// engine; backends leave it empty.
    #[error("Transcription error{}: {message}", window_label(.window))]
    Transcription { window: Option<u64>, message: String },

    #[error("Audio source read failed: {0}")]
    Read(String),

    #[error("Segment validation failed: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("HTTP request failed: {0}")]
    HttpRequest(String),

    #[error("WAV packaging error: {0}")]
    Wav(String),
}

fn window_label(window: &Option<u64>) -> String {
    match window {
        Some(sequence) => format!(" (window {})", sequence),
        None => String::new(),
    }
}

impl DomainError {
    /// Shorthand for a backend-local transcription failure.
    pub fn transcription(message: impl Into<String>) -> Self {
        DomainError::Transcription {
            window: None,
            message: message.into(),
        }
    }

    /// Attach a window ordinal to a transcription failure.
    pub fn for_window(self, sequence: u64) -> Self {
        match self {
            DomainError::Transcription { message, .. } => DomainError::Transcription {
                window: Some(sequence),
                message,
            },
            other => DomainError::Transcription {
                window: Some(sequence),
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for DomainError {
    fn from(err: toml::de::Error) -> Self {
        DomainError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DomainError {
    fn from(err: toml::ser::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

impl From<hound::Error> for DomainError {
    fn from(err: hound::Error) -> Self {
        DomainError::Wav(err.to_string())
    }
}

impl From<reqwest::Error> for DomainError {
    fn from(err: reqwest::Error) -> Self {
        DomainError::HttpRequest(err.to_string())
    }
}
