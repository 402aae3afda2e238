use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use tracing::{debug, info};
use url::Url;

use crate::adapters::transcript_parser::parse_output;
use crate::adapters::wav;
use crate::domain::{AudioWindow, BackendCapability, DomainError, TranscriptionSegment};
use crate::ports::Transcriber;

/// Build the HTTP client shared by the network backends.
pub(crate) fn http_client(timeout: Duration) -> Result<Client, DomainError> {
    Client::builder()
        .use_rustls_tls()
        .user_agent(format!("livescribe/{}", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| DomainError::HttpRequest(format!("Failed to create HTTP client: {}", e)))
}

/// Append a path to a base URL, keeping any path the base already has.
pub(crate) fn endpoint_url(base: &Url, path: &str) -> String {
    format!("{}/{}", base.as_str().trim_end_matches('/'), path)
}

/// Window as a multipart WAV file part.
pub(crate) fn wav_part(window: &AudioWindow) -> Result<multipart::Part, DomainError> {
    let wav = wav::encode_window(window)?;
    Ok(multipart::Part::bytes(wav)
        .file_name("window.wav")
        .mime_str("audio/wav")?)
}

/// Transcriber that posts each window to a local whisper.cpp server.
pub struct WhisperServerBackend {
    client: Client,
    endpoint: Url,
    language: Option<String>,
    capability: BackendCapability,
}

impl WhisperServerBackend {
    pub fn new(
        client: Client,
        endpoint: Url,
        language: Option<String>,
        capability: BackendCapability,
    ) -> Self {
        info!(endpoint = %endpoint, capability = %capability, "WhisperServerBackend created");
        Self {
            client,
            endpoint,
            language,
            capability,
        }
    }

    /// True when `GET {endpoint}/health` answers 2xx within `timeout`.
    pub async fn is_healthy(client: &Client, endpoint: &Url, timeout: Duration) -> bool {
        let url = endpoint_url(endpoint, "health");
        match client.get(&url).timeout(timeout).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(url = %url, status = %response.status(), "Health check rejected");
                false
            }
            Err(e) => {
                debug!(url = %url, error = %e, "Health check failed");
                false
            }
        }
    }
}

#[async_trait]
impl Transcriber for WhisperServerBackend {
    async fn transcribe(
        &self,
        window: &AudioWindow,
    ) -> Result<Vec<TranscriptionSegment>, DomainError> {
        let url = endpoint_url(&self.endpoint, "inference");

        let mut form = multipart::Form::new()
            .part("file", wav_part(window)?)
            .text("response_format", "verbose_json")
            .text("temperature", "0.0");
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        debug!(url = %url, window = window.sequence(), bytes = window.len(), "Posting window");

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(DomainError::transcription(format!(
                "HTTP {} from {}: {}",
                status, url, body
            )));
        }

        let body = response.text().await?;
        parse_output(&body, window.duration_ms())
    }

    fn capability(&self) -> BackendCapability {
        self.capability
    }

    fn name(&self) -> &str {
        "whisper-server"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_http::{spawn_responder, CannedResponse};
    use crate::domain::{StreamConfig, WindowGeometry};

    fn window() -> AudioWindow {
        let geometry = WindowGeometry::from_config(&StreamConfig::default()).unwrap();
        AudioWindow::new(vec![0u8; 64_000], 4, 18_000, false, geometry)
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let base = Url::parse("http://127.0.0.1:8080").unwrap();
        assert_eq!(endpoint_url(&base, "health"), "http://127.0.0.1:8080/health");

        let base = Url::parse("http://host/whisper/").unwrap();
        assert_eq!(endpoint_url(&base, "inference"), "http://host/whisper/inference");
    }

    #[tokio::test]
    async fn test_health_check() {
        let client = http_client(Duration::from_secs(2)).unwrap();

        let (healthy, _requests) =
            spawn_responder(vec![CannedResponse::ok("{\"status\":\"ok\"}")]).await;
        assert!(WhisperServerBackend::is_healthy(&client, &healthy, Duration::from_secs(1)).await);

        let (sick, _requests) = spawn_responder(vec![CannedResponse::status(503, "loading")]).await;
        assert!(!WhisperServerBackend::is_healthy(&client, &sick, Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_transcribe_verbose_json() {
        let (endpoint, requests) = spawn_responder(vec![CannedResponse::ok(
            r#"{"text":"hello","segments":[{"start":0.0,"end":1.0,"text":" hello"}]}"#,
        )])
        .await;

        let backend = WhisperServerBackend::new(
            http_client(Duration::from_secs(5)).unwrap(),
            endpoint,
            Some("en".to_string()),
            BackendCapability::accelerated(0),
        );
        let segments = backend.transcribe(&window()).await.unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "hello");
        assert_eq!(segments[0].end_ms, 1000);

        let request = requests.lock().first().cloned().unwrap();
        assert!(request.starts_with("POST /inference"));
        assert!(request.contains("verbose_json"));
        assert!(request.contains("RIFF"));
    }

    #[tokio::test]
    async fn test_non_2xx_is_error() {
        let (endpoint, _requests) =
            spawn_responder(vec![CannedResponse::status(500, "boom")]).await;

        let backend = WhisperServerBackend::new(
            http_client(Duration::from_secs(5)).unwrap(),
            endpoint,
            None,
            BackendCapability::unaccelerated(),
        );
        let err = backend.transcribe(&window()).await.unwrap_err();

        match err {
            DomainError::Transcription { message, .. } => {
                assert!(message.contains("500"));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
