use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::domain::DomainError;
use crate::ports::AudioSource;

/// Audio source over any tokio reader (stdin, a file, a socket).
///
/// End of file reads as "no data right now". With a stall timeout, a read
/// that produces nothing in time reads the same way, which lets a live pipe
/// that has gone quiet enter the engine's idle protocol instead of blocking
/// it indefinitely.
pub struct ReaderSource<R> {
    reader: R,
    stall_timeout: Option<Duration>,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            stall_timeout: None,
        }
    }

    pub fn with_stall_timeout(mut self, timeout: Duration) -> Self {
        self.stall_timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl<R> AudioSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, DomainError> {
        let read = match self.stall_timeout {
            // AsyncReadExt::read is cancel safe: a timed-out read loses no bytes.
            Some(timeout) => match tokio::time::timeout(timeout, self.reader.read(buf)).await {
                Ok(result) => result,
                Err(_) => {
                    trace!(timeout_ms = timeout.as_millis() as u64, "Source read stalled");
                    return Ok(0);
                }
            },
            None => self.reader.read(buf).await,
        };

        read.map_err(|e| DomainError::Read(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_then_reports_end() {
        let data: &[u8] = &[1, 2, 3, 4];
        let mut source = ReaderSource::new(data);
        let mut buf = [0u8; 8];

        assert_eq!(source.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);
        assert_eq!(source.read(&mut buf).await.unwrap(), 0);
        assert_eq!(source.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stalled_pipe_reads_as_no_data() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut source =
            ReaderSource::new(reader).with_stall_timeout(Duration::from_millis(20));
        let mut buf = [0u8; 8];

        assert_eq!(source.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pipe_data_after_stall() {
        use tokio::io::AsyncWriteExt;

        let (mut writer, reader) = tokio::io::duplex(64);
        let mut source =
            ReaderSource::new(reader).with_stall_timeout(Duration::from_millis(20));
        let mut buf = [0u8; 8];

        assert_eq!(source.read(&mut buf).await.unwrap(), 0);
        writer.write_all(&[9, 9]).await.unwrap();
        assert_eq!(source.read(&mut buf).await.unwrap(), 2);
    }
}
