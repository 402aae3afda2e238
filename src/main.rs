use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};

use livescribe::adapters::{JsonLinesSink, NvidiaSmiProbe, ReaderSource, TomlConfigStore};
use livescribe::{AppController, CancelToken, ExitReason};

/// Transcribe raw PCM from stdin into JSON lines on stdout.
#[derive(Debug, Parser)]
#[command(name = "livescribe", version, about)]
struct Cli {
    /// Configuration file (defaults to the OS config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds without input before the stream is considered finished
    #[arg(long, value_name = "SECS")]
    timeout: Option<f64>,

    /// Window length in seconds
    #[arg(long, value_name = "SECS")]
    chunk: Option<f64>,

    /// Overlap carried between windows, in seconds
    #[arg(long, value_name = "SECS")]
    overlap: Option<f64>,

    /// Log per-window detail
    #[arg(long)]
    debug: bool,

    /// Log one line per backend invocation
    #[arg(long)]
    verbose_metrics: bool,

    /// Treat stdin as drained after this many ms without data, so a live
    /// pause counts towards --timeout. With 0 a read blocks until data or EOF
    /// and the idle timeout only starts once stdin is closed.
    #[arg(long, value_name = "MS", default_value_t = 100)]
    stall_timeout_ms: u64,
}

impl Cli {
    fn stall_timeout(&self) -> Option<Duration> {
        (self.stall_timeout_ms > 0).then(|| Duration::from_millis(self.stall_timeout_ms))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let store = match &cli.config {
        Some(path) => TomlConfigStore::at_path(path),
        None => TomlConfigStore::new().context("locating config directory")?,
    };
    let controller = AppController::new(store).context("initializing")?;

    controller
        .override_config(|config| {
            if let Some(timeout) = cli.timeout {
                config.stream.timeout_secs = timeout;
            }
            if let Some(chunk) = cli.chunk {
                config.stream.chunk_duration_secs = chunk;
            }
            if let Some(overlap) = cli.overlap {
                config.stream.overlap_secs = overlap;
            }
            config.runtime.debug |= cli.debug;
            config.runtime.verbose_metrics |= cli.verbose_metrics;
        })
        .context("invalid stream settings")?;

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            interrupt.cancel();
        }
    });

    let mut source = ReaderSource::new(tokio::io::stdin());
    if let Some(stall) = cli.stall_timeout() {
        source = source.with_stall_timeout(stall);
    }
    let mut sink = JsonLinesSink::new(std::io::stdout());

    let summary = controller
        .run(source, &mut sink, cancel, Arc::new(NvidiaSmiProbe::new()))
        .await
        .context("transcription failed")?;
    controller.report(&summary);

    match summary.exit {
        ExitReason::IdleTimeout | ExitReason::Cancelled => Ok(()),
        ExitReason::ReceiverClosed => {
            warn!("Output closed before the stream ended");
            Ok(())
        }
        ExitReason::SourceError(message) => bail!("audio source failed: {}", message),
        ExitReason::Fault(message) => bail!("engine fault: {}", message),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_stall_timeout_defaults_to_poll_interval() {
        let cli = Cli::parse_from(["livescribe"]);
        assert_eq!(cli.stall_timeout(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_zero_stall_timeout_blocks_on_stdin() {
        let cli = Cli::parse_from(["livescribe", "--stall-timeout-ms", "0"]);
        assert_eq!(cli.stall_timeout(), None);
    }
}
