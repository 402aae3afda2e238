use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::adapters::transcript_parser::parse_output;
use crate::adapters::wav;
use crate::domain::{
    AudioWindow, BackendCapability, BackendConfig, DomainError, TranscriptionSegment,
};
use crate::ports::Transcriber;

/// Longest stderr excerpt carried into an error message.
const STDERR_EXCERPT: usize = 512;

/// Transcriber that runs the whisper.cpp command line tool once per window.
///
/// Each call writes the window as WAV into a private temp directory, runs the
/// tool with JSON output, and parses the result. The directory is removed
/// when the call returns or is cancelled; the child is killed if the call is
/// dropped mid-run.
pub struct WhisperCliBackend {
    executable: PathBuf,
    model_path: PathBuf,
    language: Option<String>,
    threads: u32,
    capability: BackendCapability,
}

impl WhisperCliBackend {
    /// Create a backend for a located executable.
    ///
    /// `threads == 0` means available parallelism minus one.
    pub fn new(
        executable: PathBuf,
        config: &BackendConfig,
        capability: BackendCapability,
    ) -> Self {
        let threads = if config.threads == 0 {
            std::thread::available_parallelism()
                .map(|p| std::cmp::max(1, p.get() as u32 - 1))
                .unwrap_or(1)
        } else {
            config.threads
        };

        info!(
            executable = ?executable,
            model = %config.model_path,
            threads,
            capability = %capability,
            "WhisperCliBackend created"
        );

        Self {
            executable,
            model_path: PathBuf::from(&config.model_path),
            language: config.language_hint().map(str::to_string),
            threads,
            capability,
        }
    }

    /// First candidate that resolves to an existing file.
    ///
    /// Candidates containing a path separator are checked as given; bare
    /// names are searched for on `PATH`.
    pub fn locate(candidates: &[String]) -> Option<PathBuf> {
        candidates.iter().find_map(|candidate| {
            let path = Path::new(candidate);
            if path.components().count() > 1 || path.is_absolute() {
                path.is_file().then(|| path.to_path_buf())
            } else {
                search_path(candidate)
            }
        })
    }

    fn command(&self, wav_path: &Path, output_base: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg(wav_path)
            .arg("-oj")
            .arg("-of")
            .arg(output_base)
            .arg("-np")
            .arg("-t")
            .arg(self.threads.to_string())
            .arg("-l")
            .arg(self.language.as_deref().unwrap_or("auto"));

        if self.capability.uses_acceleration {
            cmd.arg("-dev").arg(self.capability.device_id.to_string());
        } else {
            cmd.arg("-ng");
        }

        cmd.kill_on_drop(true);
        cmd
    }
}

fn search_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[async_trait]
impl Transcriber for WhisperCliBackend {
    async fn transcribe(
        &self,
        window: &AudioWindow,
    ) -> Result<Vec<TranscriptionSegment>, DomainError> {
        let wav = wav::encode_window(window)?;

        let workdir = tempfile::Builder::new().prefix("livescribe-").tempdir()?;
        let wav_path = workdir.path().join("window.wav");
        let output_base = workdir.path().join("out");
        tokio::fs::write(&wav_path, &wav).await?;

        debug!(
            window = window.sequence(),
            bytes = window.len(),
            workdir = ?workdir.path(),
            "Running whisper CLI"
        );

        let output = self
            .command(&wav_path, &output_base)
            .output()
            .await
            .map_err(|e| {
                DomainError::transcription(format!(
                    "failed to run {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            return Err(DomainError::transcription(format!(
                "{} exited with {}: {}",
                self.executable.display(),
                output.status,
                excerpt
            )));
        }

        let json_path = output_base.with_extension("json");
        let body = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            DomainError::transcription(format!(
                "missing CLI output {}: {}",
                json_path.display(),
                e
            ))
        })?;

        parse_output(&body, window.duration_ms())
    }

    fn capability(&self) -> BackendCapability {
        self.capability
    }

    fn name(&self) -> &str {
        "whisper-cli"
    }
}
