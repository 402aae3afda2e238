use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::domain::{AudioWindow, DomainError};

/// Wrap a window's raw little-endian PCM in a mono RIFF/WAVE container.
///
/// 1 byte per sample is unsigned 8-bit PCM, 2 and 3 bytes are signed
/// integer PCM and 4 bytes is 32-bit float. A trailing incomplete sample is
/// dropped.
pub fn encode_window(window: &AudioWindow) -> Result<Vec<u8>, DomainError> {
    encode_pcm(window.bytes(), window.sample_rate(), window.bytes_per_sample())
}

pub fn encode_pcm(
    bytes: &[u8],
    sample_rate: u32,
    bytes_per_sample: u32,
) -> Result<Vec<u8>, DomainError> {
    let sample_format = match bytes_per_sample {
        1..=3 => SampleFormat::Int,
        4 => SampleFormat::Float,
        other => {
            return Err(DomainError::Wav(format!(
                "unsupported sample width: {} bytes",
                other
            )))
        }
    };
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: (bytes_per_sample * 8) as u16,
        sample_format,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(bytes.len() + 44));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;

        match bytes_per_sample {
            1 => {
                for &byte in bytes {
                    // hound takes signed samples and stores them offset by 128.
                    writer.write_sample((byte as i16 - 128) as i8)?;
                }
            }
            2 => {
                for chunk in bytes.chunks_exact(2) {
                    writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
                }
            }
            3 => {
                for chunk in bytes.chunks_exact(3) {
                    // Sign-extend from the top byte.
                    let sample = i32::from_le_bytes([0, chunk[0], chunk[1], chunk[2]]) >> 8;
                    writer.write_sample(sample)?;
                }
            }
            _ => {
                for chunk in bytes.chunks_exact(4) {
                    let sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                    writer.write_sample(sample)?;
                }
            }
        }

        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
