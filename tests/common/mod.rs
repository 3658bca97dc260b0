#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tutor_voice::audio::{
    AudioBuffer, AudioClock, CaptureFrame, CaptureSource, CompletionFn, PlaybackSink,
};
use tutor_voice::error::SessionError;
use tutor_voice::live::{AudioMessage, ChannelEvent, LiveChannel, LiveConnector};

/// Test clock advanced by hand
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(0.0),
        })
    }

    pub fn advance(&self, secs: f64) {
        *self.now.lock().unwrap() += secs;
    }

    pub fn set(&self, secs: f64) {
        *self.now.lock().unwrap() = secs;
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledCall {
    pub id: u64,
    pub start_at: f64,
    pub duration: f64,
    pub frames: usize,
}

/// Sink that records scheduling calls and lets tests drive completion
pub struct RecordingSink {
    pub scheduled: Mutex<Vec<ScheduledCall>>,
    pub halted: Mutex<Vec<u64>>,
    completions: Mutex<HashMap<u64, CompletionFn>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scheduled: Mutex::new(Vec::new()),
            halted: Mutex::new(Vec::new()),
            completions: Mutex::new(HashMap::new()),
        })
    }

    /// Fire the completion callback for a scheduled buffer
    pub fn complete(&self, id: u64) {
        if let Some(done) = self.completions.lock().unwrap().remove(&id) {
            done();
        }
    }

    pub fn starts(&self) -> Vec<f64> {
        self.scheduled.lock().unwrap().iter().map(|c| c.start_at).collect()
    }
}

impl PlaybackSink for RecordingSink {
    fn schedule(&self, id: u64, buffer: &AudioBuffer, start_at: f64, done: CompletionFn) {
        self.scheduled.lock().unwrap().push(ScheduledCall {
            id,
            start_at,
            duration: buffer.duration_secs(),
            frames: buffer.frame_count(),
        });
        self.completions.lock().unwrap().insert(id, done);
    }

    fn halt(&self, id: u64) {
        self.halted.lock().unwrap().push(id);
    }
}

/// Capture source that emits a scripted set of frames and then idles with
/// the channel held open until stopped
pub struct ScriptedCapture {
    frames: Vec<Vec<f32>>,
    sample_rate: u32,
    hold: Option<mpsc::Sender<CaptureFrame>>,
}

impl ScriptedCapture {
    pub fn new(frames: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            frames,
            sample_rate,
            hold: None,
        }
    }

    pub fn silent(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }
}

#[async_trait::async_trait]
impl CaptureSource for ScriptedCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>, SessionError> {
        let (tx, rx) = mpsc::channel(self.frames.len().max(1) + 1);

        for (i, samples) in self.frames.iter().enumerate() {
            let frame = CaptureFrame {
                samples: samples.clone(),
                sample_rate: self.sample_rate,
                timestamp_ms: i as u64 * 256,
            };
            tx.try_send(frame).expect("scripted frame channel overflow");
        }

        self.hold = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.hold = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.hold.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Capture source standing in for a denied microphone
pub struct DeniedCapture;

#[async_trait::async_trait]
impl CaptureSource for DeniedCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureFrame>, SessionError> {
        Err(SessionError::Permission("microphone denied".to_string()))
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "denied"
    }
}

/// In-process live channel that records everything sent
pub struct MockChannel {
    pub sent_audio: Mutex<Vec<AudioMessage>>,
    pub sent_text: Mutex<Vec<String>>,
    pub closed: AtomicBool,
}

impl MockChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent_audio: Mutex::new(Vec::new()),
            sent_text: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn audio_count(&self) -> usize {
        self.sent_audio.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LiveChannel for MockChannel {
    async fn send_audio(&self, message: AudioMessage) -> Result<(), SessionError> {
        self.sent_audio.lock().unwrap().push(message);
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), SessionError> {
        self.sent_text.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector handing out pre-built event receivers, one per connect
pub struct MockConnector {
    channel: Arc<MockChannel>,
    receivers: Mutex<VecDeque<mpsc::Receiver<ChannelEvent>>>,
    fail_with: Option<String>,
    pub connects: AtomicUsize,
}

impl MockConnector {
    /// Build a connector good for `runs` connects, returning the event
    /// senders (one per run) and the shared channel.
    pub fn new(runs: usize) -> (Arc<Self>, Vec<mpsc::Sender<ChannelEvent>>, Arc<MockChannel>) {
        let mut senders = Vec::with_capacity(runs);
        let mut receivers = VecDeque::with_capacity(runs);

        for _ in 0..runs {
            let (tx, rx) = mpsc::channel(64);
            senders.push(tx);
            receivers.push_back(rx);
        }

        let channel = MockChannel::new();
        let connector = Arc::new(Self {
            channel: Arc::clone(&channel),
            receivers: Mutex::new(receivers),
            fail_with: None,
            connects: AtomicUsize::new(0),
        });

        (connector, senders, channel)
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            channel: MockChannel::new(),
            receivers: Mutex::new(VecDeque::new()),
            fail_with: Some(reason.to_string()),
            connects: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl LiveConnector for MockConnector {
    async fn connect(
        &self,
        _session_id: &str,
    ) -> Result<(Arc<dyn LiveChannel>, mpsc::Receiver<ChannelEvent>), SessionError> {
        if let Some(reason) = &self.fail_with {
            return Err(SessionError::Handshake(reason.clone()));
        }

        let rx = self
            .receivers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SessionError::Handshake("no more scripted connections".to_string()))?;

        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok((Arc::clone(&self.channel) as Arc<dyn LiveChannel>, rx))
    }
}

/// Poll until `cond` holds or the timeout elapses
pub async fn wait_until<F: Fn() -> bool>(cond: F, timeout_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
