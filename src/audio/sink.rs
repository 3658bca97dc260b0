use super::codec::AudioBuffer;
use super::playback::{CompletionFn, PlaybackSink};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Playback sink that persists scheduled audio to a WAV file.
///
/// Buffers are written in schedule order, which matches playback order by
/// the scheduler's cursor invariant. `halt` cannot unwrite flushed samples,
/// so an interrupted reply remains on disk up to the point it was cut off.
pub struct WavSink {
    path: PathBuf,
    writer: Mutex<Option<hound::WavWriter<BufWriter<File>>>>,
}

impl WavSink {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32, channels: u16) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create sink output directory")?;
        }

        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV sink: {:?}", path))?;

        Ok(Self {
            path,
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close the file. Safe to call more than once.
    pub fn finalize(&self) -> Result<()> {
        if let Some(writer) = self.writer.lock().unwrap().take() {
            writer.finalize().context("Failed to finalize WAV sink")?;
        }
        Ok(())
    }
}

impl PlaybackSink for WavSink {
    fn schedule(&self, _id: u64, buffer: &AudioBuffer, _start_at: f64, done: CompletionFn) {
        {
            let mut guard = self.writer.lock().unwrap();
            if let Some(writer) = guard.as_mut() {
                for &sample in &buffer.samples {
                    let quantized = (sample.clamp(-1.0, 1.0) * 32768.0)
                        .clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                    if let Err(e) = writer.write_sample(quantized) {
                        warn!("Failed to write sample to WAV sink: {}", e);
                        break;
                    }
                }
            }
        }

        // File writes complete as soon as they are flushed
        done();
    }

    fn halt(&self, _id: u64) {}
}

impl Drop for WavSink {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.lock().unwrap().take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV sink on drop: {}", e);
            }
        }
    }
}
