use base64::Engine;
use thiserror::Error;

/// A decoded, playable buffer of float PCM samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Samples in [-1.0, 1.0], interleaved when `channels` > 1
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

impl AudioBuffer {
    /// Number of sample frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Playable duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload of {0} bytes is not aligned to 16-bit samples")]
    TruncatedSample(usize),

    #[error("{samples} samples cannot be de-interleaved into {channels} channels")]
    ChannelMisaligned { samples: usize, channels: u16 },
}

/// Encode float PCM samples into the transport form: 16-bit signed
/// little-endian bytes, base64.
///
/// Samples are clamped to [-1.0, 1.0] before scaling, so out-of-range
/// input saturates instead of wrapping.
pub fn encode_frame(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * 32768.0) as i32;
        let quantized = scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        bytes.extend_from_slice(&quantized.to_le_bytes());
    }
    base64::engine::general_purpose::STANDARD.encode(&bytes)
}

/// Decode a transport frame back into float PCM at the declared rate.
///
/// A zero-length payload yields a zero-length buffer.
pub fn decode_frame(
    data: &str,
    sample_rate: u32,
    channels: u16,
) -> Result<AudioBuffer, DecodeError> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;

    if bytes.len() % 2 != 0 {
        return Err(DecodeError::TruncatedSample(bytes.len()));
    }

    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect();

    if channels > 1 && samples.len() % channels as usize != 0 {
        return Err(DecodeError::ChannelMisaligned {
            samples: samples.len(),
            channels,
        });
    }

    Ok(AudioBuffer {
        samples,
        sample_rate,
        channels,
    })
}
