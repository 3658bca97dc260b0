use super::config::SessionConfig;
use super::stats::SessionStats;
use super::transcript::{Speaker, Turn, TurnAccumulator};
use crate::audio::{
    decode_frame, encode_frame, AudioClock, CaptureSource, NullSink, PlaybackScheduler,
    PlaybackSink, WallClock,
};
use crate::error::SessionError;
use crate::live::{AudioMessage, ChannelEvent, LiveChannel, LiveConnector, ServerMessage};
use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Invoked once per torn-down session, with the final statistics. The
/// surrounding product uses this to decrement its practice-time quota.
pub type UsageHook = Arc<dyn Fn(SessionStats) + Send + Sync>;

/// Invoked when an active session is ended by a channel failure, after
/// teardown has already run.
pub type ErrorHook = Arc<dyn Fn(SessionError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Connecting,
    Active,
}

impl SessionState {
    fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Active => "active",
        }
    }
}

/// A live spoken-conversation session with the tutoring speech model.
///
/// Owns exactly one conversation at a time: microphone frames are encoded
/// and pumped out on the live channel, inbound events are demultiplexed
/// into playback audio and transcript turns. `start` is a no-op while a
/// session is connecting or active; `stop` is idempotent and safe from
/// any state, including the channel's own failure path.
pub struct VoiceSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    state: Mutex<SessionState>,
    capture: AsyncMutex<Box<dyn CaptureSource>>,
    connector: Arc<dyn LiveConnector>,
    scheduler: Arc<PlaybackScheduler>,
    channel: Mutex<Option<Arc<dyn LiveChannel>>>,
    transcript: Mutex<Vec<Turn>>,
    pump_task: Mutex<Option<JoinHandle<()>>>,
    demux_task: Mutex<Option<JoinHandle<()>>>,
    frames_sent: AtomicUsize,
    started_at: Mutex<Option<chrono::DateTime<Utc>>>,
    on_error: Option<ErrorHook>,
    on_usage: Option<UsageHook>,
}

/// Builder for `VoiceSession`; the capture source and channel connector
/// are required, clock and playback sink default to wall time and a
/// discarding sink.
pub struct VoiceSessionBuilder {
    config: SessionConfig,
    capture: Option<Box<dyn CaptureSource>>,
    connector: Option<Arc<dyn LiveConnector>>,
    clock: Arc<dyn AudioClock>,
    sink: Arc<dyn PlaybackSink>,
    on_error: Option<ErrorHook>,
    on_usage: Option<UsageHook>,
}

impl VoiceSessionBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            capture: None,
            connector: None,
            clock: Arc::new(WallClock::new()),
            sink: Arc::new(NullSink),
            on_error: None,
            on_usage: None,
        }
    }

    pub fn capture(mut self, capture: Box<dyn CaptureSource>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn LiveConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn AudioClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn sink(mut self, sink: Arc<dyn PlaybackSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn on_error(mut self, hook: ErrorHook) -> Self {
        self.on_error = Some(hook);
        self
    }

    pub fn on_usage(mut self, hook: UsageHook) -> Self {
        self.on_usage = Some(hook);
        self
    }

    pub fn build(self) -> Result<VoiceSession> {
        let capture = match self.capture {
            Some(c) => c,
            None => anyhow::bail!("a capture source is required"),
        };
        let connector = match self.connector {
            Some(c) => c,
            None => anyhow::bail!("a live channel connector is required"),
        };

        let scheduler = Arc::new(PlaybackScheduler::new(self.clock, self.sink));

        Ok(VoiceSession {
            inner: Arc::new(SessionInner {
                config: self.config,
                state: Mutex::new(SessionState::Idle),
                capture: AsyncMutex::new(capture),
                connector,
                scheduler,
                channel: Mutex::new(None),
                transcript: Mutex::new(Vec::new()),
                pump_task: Mutex::new(None),
                demux_task: Mutex::new(None),
                frames_sent: AtomicUsize::new(0),
                started_at: Mutex::new(None),
                on_error: self.on_error,
                on_usage: self.on_usage,
            }),
        })
    }
}

impl VoiceSession {
    pub fn builder(config: SessionConfig) -> VoiceSessionBuilder {
        VoiceSessionBuilder::new(config)
    }

    pub fn session_id(&self) -> &str {
        &self.inner.config.session_id
    }

    /// Start the conversation: acquire the capture source, open the live
    /// channel, then begin pumping frames and demultiplexing events.
    ///
    /// A no-op when already connecting or active. Connection-phase
    /// failures tear everything back down and return the error directly.
    pub async fn start(&self) -> Result<(), SessionError> {
        {
            let mut state = self.inner.state.lock().unwrap();
            if *state != SessionState::Idle {
                warn!("Session {} already started", self.session_id());
                return Ok(());
            }
            *state = SessionState::Connecting;
        }

        info!("Starting voice session: {}", self.session_id());

        // Fresh run: the transcript belongs to one session lifetime
        self.inner.transcript.lock().unwrap().clear();
        self.inner.frames_sent.store(0, Ordering::SeqCst);
        *self.inner.started_at.lock().unwrap() = Some(Utc::now());

        let frame_rx = {
            let mut capture = self.inner.capture.lock().await;
            match capture.start().await {
                Ok(rx) => rx,
                Err(e) => {
                    error!("Capture source failed to start: {}", e);
                    *self.inner.state.lock().unwrap() = SessionState::Idle;
                    return Err(e);
                }
            }
        };

        let (channel, event_rx) = match self.inner.connector.connect(self.session_id()).await {
            Ok(open) => open,
            Err(e) => {
                error!("Live channel handshake failed: {}", e);
                let mut capture = self.inner.capture.lock().await;
                if let Err(stop_err) = capture.stop().await {
                    warn!("Capture stop after failed handshake: {}", stop_err);
                }
                *self.inner.state.lock().unwrap() = SessionState::Idle;
                return Err(e);
            }
        };

        *self.inner.channel.lock().unwrap() = Some(Arc::clone(&channel));

        let activated = {
            let mut state = self.inner.state.lock().unwrap();
            if *state == SessionState::Connecting {
                *state = SessionState::Active;
                true
            } else {
                false
            }
        };

        if !activated {
            // stop() claimed the session mid-handshake; unwind what was
            // just acquired and report the start as a no-op
            warn!("Session {} stopped during handshake", self.session_id());
            let channel = self.inner.channel.lock().unwrap().take();
            if let Some(channel) = channel {
                channel.close().await;
            }
            let mut capture = self.inner.capture.lock().await;
            if let Err(e) = capture.stop().await {
                warn!("Capture stop after cancelled start: {}", e);
            }
            return Ok(());
        }

        let pump = tokio::spawn(pump_frames(Arc::clone(&self.inner), channel, frame_rx));
        let demux = tokio::spawn(demux_events(Arc::clone(&self.inner), event_rx));

        *self.inner.pump_task.lock().unwrap() = Some(pump);
        *self.inner.demux_task.lock().unwrap() = Some(demux);

        info!("Voice session active: {}", self.session_id());

        Ok(())
    }

    /// Stop the conversation and release every resource.
    ///
    /// Idempotent: stopping an idle session (or stopping twice) is a
    /// no-op returning the final statistics either way.
    pub async fn stop(&self) -> SessionStats {
        let claimed = self.inner.teardown().await;

        // The pump drains out once capture stops; the demux loop may be
        // parked on the event stream, so it is cancelled when we did the
        // teardown ourselves (on the failure path it exits on its own).
        let pump = self.inner.pump_task.lock().unwrap().take();
        if let Some(task) = pump {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("Frame pump ended abnormally: {}", e);
                }
            }
        }

        let demux = self.inner.demux_task.lock().unwrap().take();
        if let Some(task) = demux {
            if claimed {
                task.abort();
            }
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("Event demux ended abnormally: {}", e);
                }
            }
        }

        self.stats()
    }

    /// Append a typed user turn directly to the transcript and forward it
    /// on the channel's text side-channel, bypassing the accumulators.
    pub async fn send_text(&self, text: &str) -> Result<(), SessionError> {
        let channel = {
            let state = self.inner.state.lock().unwrap();
            if *state != SessionState::Active {
                return Err(SessionError::NotActive);
            }
            self.inner.channel.lock().unwrap().clone()
        };

        let channel = channel.ok_or(SessionError::NotActive)?;

        self.inner
            .transcript
            .lock()
            .unwrap()
            .push(Turn::new(Speaker::User, text));

        // Fire-and-forget: delivery of typed input is not awaited past the
        // publish itself
        if let Err(e) = channel.send_text(text).await {
            warn!("Typed input send failed: {}", e);
        }

        Ok(())
    }

    /// Ordered transcript of finalized turns accumulated so far
    pub fn transcript(&self) -> Vec<Turn> {
        self.inner.transcript.lock().unwrap().clone()
    }

    pub fn stats(&self) -> SessionStats {
        self.inner.stats()
    }

    /// The session's playback scheduler (shared with the demux loop)
    pub fn playback(&self) -> Arc<PlaybackScheduler> {
        Arc::clone(&self.inner.scheduler)
    }

    pub fn is_active(&self) -> bool {
        *self.inner.state.lock().unwrap() == SessionState::Active
    }
}

impl SessionInner {
    /// The single teardown routine. Every exit path funnels here: explicit
    /// stop, channel close, channel error. Returns true for the caller
    /// that actually performed the teardown; later callers are no-ops.
    async fn teardown(&self) -> bool {
        {
            let mut state = self.state.lock().unwrap();
            if *state == SessionState::Idle {
                return false;
            }
            *state = SessionState::Idle;
        }

        info!("Tearing down voice session: {}", self.config.session_id);

        {
            let mut capture = self.capture.lock().await;
            if let Err(e) = capture.stop().await {
                warn!("Capture stop during teardown: {}", e);
            }
        }

        let channel = self.channel.lock().unwrap().take();
        if let Some(channel) = channel {
            channel.close().await;
        }

        self.scheduler.stop_all();

        if let Some(hook) = &self.on_usage {
            hook(self.stats());
        }

        info!("Voice session torn down: {}", self.config.session_id);

        true
    }

    fn stats(&self) -> SessionStats {
        let started_at = *self.started_at.lock().unwrap();
        let duration_secs = started_at
            .map(|t| Utc::now().signed_duration_since(t).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        SessionStats {
            session_id: self.config.session_id.clone(),
            state: self.state.lock().unwrap().as_str().to_string(),
            started_at,
            duration_secs,
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            turns_count: self.transcript.lock().unwrap().len(),
        }
    }

    fn is_active(&self) -> bool {
        *self.state.lock().unwrap() == SessionState::Active
    }
}

/// Outbound half: every captured frame is encoded and sent immediately.
/// Sends are fire-and-forget; a failed publish is logged and the stream
/// keeps going.
async fn pump_frames(
    inner: Arc<SessionInner>,
    channel: Arc<dyn LiveChannel>,
    mut frame_rx: mpsc::Receiver<crate::audio::CaptureFrame>,
) {
    info!("Frame pump started");

    while let Some(frame) = frame_rx.recv().await {
        if !inner.is_active() {
            break;
        }

        let encoded = encode_frame(&frame.samples);
        let message = AudioMessage::pcm(encoded, frame.sample_rate);

        if let Err(e) = channel.send_audio(message).await {
            warn!("Failed to send audio frame: {}", e);
            continue;
        }

        inner.frames_sent.fetch_add(1, Ordering::SeqCst);
    }

    info!("Frame pump stopped");
}

/// Inbound half: demultiplex server events in arrival order. Channel
/// close and channel failure both funnel into the shared teardown.
async fn demux_events(inner: Arc<SessionInner>, mut event_rx: mpsc::Receiver<ChannelEvent>) {
    info!("Event demux started");

    let mut accumulator = TurnAccumulator::new();

    while let Some(event) = event_rx.recv().await {
        match event {
            ChannelEvent::Message(message) => {
                handle_server_message(&inner, &mut accumulator, message);
            }
            ChannelEvent::Closed => {
                info!("Live channel closed by peer");
                inner.teardown().await;
                break;
            }
            ChannelEvent::Failed(reason) => {
                error!("Live channel failed: {}", reason);
                inner.teardown().await;
                if let Some(hook) = &inner.on_error {
                    hook(SessionError::Channel(reason));
                }
                break;
            }
        }
    }

    info!("Event demux stopped");
}

/// Handle one inbound message. Fields co-occur and are all processed:
/// audio to the scheduler, transcription fragments to the accumulators,
/// turn boundary flushes, interruption clears playback.
fn handle_server_message(
    inner: &SessionInner,
    accumulator: &mut TurnAccumulator,
    message: ServerMessage,
) {
    if let Some(blob) = &message.inline_data {
        match decode_frame(&blob.data, inner.config.playback_rate, 1) {
            Ok(buffer) => {
                inner.scheduler.enqueue(&buffer);
            }
            Err(e) => {
                // One bad frame must not end an otherwise healthy session
                warn!("Dropping undecodable audio frame: {}", e);
            }
        }
    }

    if let Some(fragment) = &message.input_transcription {
        accumulator.push_user(&fragment.text);
    }

    if let Some(fragment) = &message.output_transcription {
        accumulator.push_assistant(&fragment.text);
    }

    if message.turn_complete {
        let turns = accumulator.flush();
        if !turns.is_empty() {
            inner.transcript.lock().unwrap().extend(turns);
        }
    }

    if message.interrupted {
        info!("Barge-in: halting assistant playback");
        inner.scheduler.stop_all();
    }
}
