use async_trait::async_trait;
use reqwest::{multipart, Client};
use tracing::{debug, info};
use url::Url;

use crate::adapters::transcript_parser::parse_output;
use crate::adapters::whisper_server::{endpoint_url, wav_part};
use crate::domain::{AudioWindow, BackendCapability, DomainError, TranscriptionSegment};
use crate::ports::Transcriber;

/// Transcriber backed by an OpenAI-compatible `/audio/transcriptions` API.
pub struct RemoteApiBackend {
    client: Client,
    api_url: Url,
    api_key: String,
    model: String,
    language: Option<String>,
}

impl RemoteApiBackend {
    pub fn new(
        client: Client,
        api_url: Url,
        api_key: String,
        model: String,
        language: Option<String>,
    ) -> Self {
        info!(api_url = %api_url, model = %model, "RemoteApiBackend created");
        Self {
            client,
            api_url,
            api_key,
            model,
            language,
        }
    }

    /// Credential from the named environment variable, if set and non-empty.
    pub fn credential(env_var: &str) -> Option<String> {
        std::env::var(env_var)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

#[async_trait]
impl Transcriber for RemoteApiBackend {
    async fn transcribe(
        &self,
        window: &AudioWindow,
    ) -> Result<Vec<TranscriptionSegment>, DomainError> {
        let url = endpoint_url(&self.api_url, "audio/transcriptions");

        let mut form = multipart::Form::new()
            .part("file", wav_part(window)?)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");
        if let Some(language) = &self.language {
            form = form.text("language", language.clone());
        }

        debug!(model = %self.model, window = window.sequence(), "Sending window to remote API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(DomainError::transcription(format!(
                "status {}: {}",
                status, body
            )));
        }

        let body = response.text().await?;
        parse_output(&body, window.duration_ms())
    }

    /// Remote execution: local acceleration does not apply.
    fn capability(&self) -> BackendCapability {
        BackendCapability::unaccelerated()
    }

    fn name(&self) -> &str {
        "remote-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapters::test_http::{spawn_responder, CannedResponse};
    use crate::adapters::whisper_server::http_client;
    use crate::domain::{StreamConfig, WindowGeometry};

    #[test]
    fn test_credential_requires_non_empty_value() {
        assert_eq!(RemoteApiBackend::credential("LIVESCRIBE_TEST_UNSET_KEY"), None);
    }

    #[tokio::test]
    async fn test_sends_bearer_and_model() {
        let (api_url, requests) = spawn_responder(vec![CannedResponse::ok(
            r#"{"text":"remote words"}"#,
        )])
        .await;
        let backend = RemoteApiBackend::new(
            http_client(Duration::from_secs(5)).unwrap(),
            api_url,
            "sk-test".to_string(),
            "whisper-1".to_string(),
            None,
        );

        let geometry = WindowGeometry::from_config(&StreamConfig::default()).unwrap();
        let window = AudioWindow::new(vec![0u8; 32_000], 0, 0, false, geometry);
        let segments = backend.transcribe(&window).await.unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "remote words");
        assert_eq!(segments[0].end_ms, 1000);

        let request = requests.lock().first().cloned().unwrap();
        assert!(request.starts_with("POST /audio/transcriptions"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains("whisper-1"));
    }

    #[tokio::test]
    async fn test_unauthorized_is_error() {
        let (api_url, _requests) = spawn_responder(vec![CannedResponse::status(
            401,
            r#"{"error":"invalid key"}"#,
        )])
        .await;
        let backend = RemoteApiBackend::new(
            http_client(Duration::from_secs(5)).unwrap(),
            api_url,
            "bad".to_string(),
            "whisper-1".to_string(),
            None,
        );

        let geometry = WindowGeometry::from_config(&StreamConfig::default()).unwrap();
        let window = AudioWindow::new(vec![0u8; 3_200], 0, 0, true, geometry);
        assert!(backend.transcribe(&window).await.is_err());
    }
}
