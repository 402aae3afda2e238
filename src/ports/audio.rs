use async_trait::async_trait;

use crate::domain::DomainError;

/// Port for the raw PCM byte stream feeding the engine.
#[async_trait]
pub trait AudioSource: Send {
    /// Read up to `buf.len()` bytes.
    ///
    /// `Ok(0)` means no data is available right now; more may arrive later.
    /// Short reads are legal. `Err` is a hard failure and ends the stream.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, DomainError>;
}
