use crate::error::SessionError;
use anyhow::Result;
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Configuration for the capture side of a session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Sample rate of outbound frames in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Fixed frame size in samples
    pub frame_samples: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // what the speech model expects on input
            channels: 1,        // Mono
            frame_samples: 4096,
        }
    }
}

/// One fixed-size chunk of captured float PCM
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    /// Samples in [-1.0, 1.0], always `frame_samples` long
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Capture source trait
///
/// Implementations own the underlying input device (or file) and deliver
/// fixed-size mono frames on a channel. Microphone capture lives behind
/// this trait in the surrounding product; this crate ships a WAV-file
/// source for scripted input and tests.
#[async_trait::async_trait]
pub trait CaptureSource: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive capture frames.
    /// Failure to acquire the input surfaces as `SessionError::Permission`.
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>, SessionError>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if the source is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Capture source backed by a WAV file
///
/// Reads the whole file up front, converts it to mono at the configured
/// rate, and emits fixed-size frames. With `realtime` set, frames are
/// paced at the rate a live microphone would produce them.
pub struct WavFileSource {
    path: PathBuf,
    config: CaptureConfig,
    realtime: bool,
    running: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl WavFileSource {
    pub fn new(path: impl AsRef<Path>, config: CaptureConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
            realtime: true,
            running: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// Disable pacing; frames are emitted as fast as the receiver drains them.
    pub fn unpaced(mut self) -> Self {
        self.realtime = false;
        self
    }

    fn load_samples(&self) -> Result<Vec<f32>, SessionError> {
        let reader = WavReader::open(&self.path)
            .map_err(|e| SessionError::Permission(format!("{}: {}", self.path.display(), e)))?;

        let spec = reader.spec();
        let raw: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SessionError::Permission(format!("{}: {}", self.path.display(), e)))?;

        let mono = mix_to_mono(&raw, spec.channels);
        let at_rate = decimate(&mono, spec.sample_rate, self.config.sample_rate);

        info!(
            "Loaded capture input {}: {} Hz {} ch -> {} mono samples at {} Hz",
            self.path.display(),
            spec.sample_rate,
            spec.channels,
            at_rate.len(),
            self.config.sample_rate
        );

        Ok(at_rate.iter().map(|&s| s as f32 / 32768.0).collect())
    }
}

#[async_trait::async_trait]
impl CaptureSource for WavFileSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>, SessionError> {
        let samples = self.load_samples()?;

        let (tx, rx) = mpsc::channel(32);
        let frame_samples = self.config.frame_samples;
        let sample_rate = self.config.sample_rate;
        let realtime = self.realtime;
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            let frame_ms = (frame_samples as u64 * 1000) / sample_rate as u64;
            let mut timestamp_ms = 0u64;

            for chunk in samples.chunks(frame_samples) {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                // Fixed-size frames only; the tail is zero-padded
                let mut frame = chunk.to_vec();
                frame.resize(frame_samples, 0.0);

                if tx
                    .send(CaptureFrame {
                        samples: frame,
                        sample_rate,
                        timestamp_ms,
                    })
                    .await
                    .is_err()
                {
                    break;
                }

                timestamp_ms += frame_ms;

                if realtime {
                    tokio::time::sleep(std::time::Duration::from_millis(frame_ms)).await;
                }
            }

            running.store(false, Ordering::SeqCst);
        });

        self.task = Some(task);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Capture task ended abnormally: {}", e);
            }
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

/// Sum interleaved channels into mono with clipping
fn mix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    let mut mono = Vec::with_capacity(samples.len() / channels);

    for frame in samples.chunks_exact(channels) {
        let sum: i32 = frame.iter().map(|&s| s as i32).sum();
        mono.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }

    mono
}

/// Downsample by decimation; upsampling is not supported and passes through
fn decimate(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    if source_rate <= target_rate {
        return samples.to_vec();
    }

    let ratio = source_rate / target_rate;
    if ratio <= 1 {
        return samples.to_vec();
    }

    samples.iter().step_by(ratio as usize).copied().collect()
}
