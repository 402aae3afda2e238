use zeroize::{Zeroize, ZeroizeOnDrop};

use super::config::StreamConfig;
use super::error::DomainError;

/// Widest supported PCM sample, in bytes.
pub const MAX_BYTES_PER_SAMPLE: u32 = 4;

/// Byte sizes derived from a [`StreamConfig`].
///
/// Sizes are whole samples, and `overlap_size < window_size` always holds for
/// a constructed value, so `step_size` is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub window_size: usize,
    pub overlap_size: usize,
    pub step_size: usize,
    pub sample_rate: u32,
    pub bytes_per_sample: u32,
}

impl WindowGeometry {
    /// Derive window sizes, rejecting any configuration the engine could not
    /// make progress with.
    pub fn from_config(config: &StreamConfig) -> Result<Self, DomainError> {
        if config.sample_rate == 0 {
            return Err(DomainError::Config("sample_rate must be positive".to_string()));
        }
        if !(1..=MAX_BYTES_PER_SAMPLE).contains(&config.bytes_per_sample) {
            return Err(DomainError::Config(format!(
                "bytes_per_sample must be between 1 and {}, got {}",
                MAX_BYTES_PER_SAMPLE, config.bytes_per_sample
            )));
        }
        for (name, value) in [
            ("chunk_duration_secs", config.chunk_duration_secs),
            ("overlap_secs", config.overlap_secs),
            ("timeout_secs", config.timeout_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DomainError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        config.idle_timeout()?;

        let window_size = span_bytes(
            "chunk_duration_secs",
            config.chunk_duration_secs,
            config.sample_rate,
            config.bytes_per_sample,
        )?;
        let overlap_size = span_bytes(
            "overlap_secs",
            config.overlap_secs,
            config.sample_rate,
            config.bytes_per_sample,
        )?;

        if window_size == 0 {
            return Err(DomainError::Config(format!(
                "chunk_duration_secs {} yields an empty window",
                config.chunk_duration_secs
            )));
        }
        if overlap_size >= window_size {
            return Err(DomainError::Config(format!(
                "overlap ({} bytes) must be smaller than the window ({} bytes)",
                overlap_size, window_size
            )));
        }

        Ok(Self {
            window_size,
            overlap_size,
            step_size: window_size - overlap_size,
            sample_rate: config.sample_rate,
            bytes_per_sample: config.bytes_per_sample,
        })
    }

    /// Bytes of audio per second of stream time.
    pub fn byte_rate(&self) -> u64 {
        self.sample_rate as u64 * self.bytes_per_sample as u64
    }

    /// Convert a byte count to milliseconds of audio, rounding down.
    pub fn bytes_to_ms(&self, bytes: u64) -> u64 {
        bytes.saturating_mul(1000) / self.byte_rate()
    }
}

/// Whole-sample byte length of `secs` of audio.
fn span_bytes(
    name: &str,
    secs: f64,
    sample_rate: u32,
    bytes_per_sample: u32,
) -> Result<usize, DomainError> {
    let too_large = || {
        DomainError::Config(format!("{} {} is too large to buffer", name, secs))
    };
    let samples = (secs * sample_rate as f64).round();
    if samples >= usize::MAX as f64 {
        return Err(too_large());
    }
    (samples as usize)
        .checked_mul(bytes_per_sample as usize)
        .ok_or_else(too_large)
}

/// One unit of audio handed to a backend.
///
/// The raw bytes are zeroed when the window is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct AudioWindow {
    bytes: Vec<u8>,
    #[zeroize(skip)]
    sequence: u64,
    #[zeroize(skip)]
    offset_ms: u64,
    #[zeroize(skip)]
    is_final: bool,
    #[zeroize(skip)]
    geometry: WindowGeometry,
}

impl AudioWindow {
    pub fn new(
        bytes: Vec<u8>,
        sequence: u64,
        offset_ms: u64,
        is_final: bool,
        geometry: WindowGeometry,
    ) -> Self {
        Self {
            bytes,
            sequence,
            offset_ms,
            is_final,
            geometry,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Ordinal of this window in the stream, starting at 0.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Stream position of the first byte, in milliseconds.
    pub fn offset_ms(&self) -> u64 {
        self.offset_ms
    }

    /// True for the short window flushed when the source ran dry.
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn sample_rate(&self) -> u32 {
        self.geometry.sample_rate
    }

    pub fn bytes_per_sample(&self) -> u32 {
        self.geometry.bytes_per_sample
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Length of the audio in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.geometry.bytes_to_ms(self.bytes.len() as u64)
    }
}

impl std::fmt::Debug for AudioWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioWindow")
            .field("sequence", &self.sequence)
            .field("offset_ms", &self.offset_ms)
            .field("is_final", &self.is_final)
            .field("len", &self.bytes.len())
            .finish()
    }
}
