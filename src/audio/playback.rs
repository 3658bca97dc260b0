use super::codec::AudioBuffer;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

/// Monotonic output clock used to schedule playback, in seconds.
pub trait AudioClock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock anchored at construction time
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for WallClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Invoked by a sink when a scheduled buffer has finished playing
pub type CompletionFn = Box<dyn FnOnce() + Send>;

/// Output sink the scheduler hands buffers to.
///
/// `schedule` is fire-and-forget: the sink owns actual rendering and calls
/// `done` when the buffer has finished. `halt` must silence a buffer that
/// is playing or still pending.
pub trait PlaybackSink: Send + Sync {
    fn schedule(&self, id: u64, buffer: &AudioBuffer, start_at: f64, done: CompletionFn);
    fn halt(&self, id: u64);
}

/// Sink that discards audio, completing every buffer immediately
pub struct NullSink;

impl PlaybackSink for NullSink {
    fn schedule(&self, _id: u64, _buffer: &AudioBuffer, _start_at: f64, done: CompletionFn) {
        done();
    }

    fn halt(&self, _id: u64) {}
}

struct ScheduleState {
    /// Earliest time the next buffer may start
    cursor: f64,
    /// Scheduled, not-yet-finished buffers (id -> scheduled start)
    active: HashMap<u64, f64>,
    next_id: u64,
}

/// Schedules decoded audio buffers back-to-back on the output clock.
///
/// Buffers play in enqueue order with no gaps and no overlap. `stop_all`
/// supports barge-in: everything is halted and the cursor snaps back to
/// the current clock time.
pub struct PlaybackScheduler {
    clock: Arc<dyn AudioClock>,
    sink: Arc<dyn PlaybackSink>,
    state: Arc<Mutex<ScheduleState>>,
}

impl PlaybackScheduler {
    pub fn new(clock: Arc<dyn AudioClock>, sink: Arc<dyn PlaybackSink>) -> Self {
        Self {
            clock,
            sink,
            state: Arc::new(Mutex::new(ScheduleState {
                cursor: 0.0,
                active: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Schedule a buffer at the earliest gap-free start time.
    ///
    /// Returns the id the buffer was scheduled under.
    pub fn enqueue(&self, buffer: &AudioBuffer) -> u64 {
        let now = self.clock.now();

        let (id, start_at) = {
            let mut state = self.state.lock().unwrap();

            let id = state.next_id;
            state.next_id += 1;

            // Never schedule into the past, even right after an interruption
            let start_at = state.cursor.max(now);
            state.cursor = start_at + buffer.duration_secs();
            state.active.insert(id, start_at);

            (id, start_at)
        };

        debug!(
            "Scheduled buffer {} at {:.3}s ({} frames, {:.3}s)",
            id,
            start_at,
            buffer.frame_count(),
            buffer.duration_secs()
        );

        let state = Arc::clone(&self.state);
        self.sink.schedule(
            id,
            buffer,
            start_at,
            Box::new(move || {
                state.lock().unwrap().active.remove(&id);
            }),
        );

        id
    }

    /// Halt every scheduled buffer and reset the cursor to "now".
    pub fn stop_all(&self) {
        let ids: Vec<u64> = {
            let mut state = self.state.lock().unwrap();
            let ids = state.active.keys().copied().collect();
            state.active.clear();
            state.cursor = self.clock.now();
            ids
        };

        if !ids.is_empty() {
            debug!("Halting {} scheduled buffers", ids.len());
        }

        for id in ids {
            self.sink.halt(id);
        }
    }

    /// Number of scheduled, not-yet-finished buffers
    pub fn active_count(&self) -> usize {
        self.state.lock().unwrap().active.len()
    }

    /// Current "next start time" cursor
    pub fn cursor(&self) -> f64 {
        self.state.lock().unwrap().cursor
    }
}
