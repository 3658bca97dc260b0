pub mod capture;
pub mod codec;
pub mod playback;
pub mod sink;

pub use capture::{CaptureConfig, CaptureFrame, CaptureSource, WavFileSource};
pub use codec::{decode_frame, encode_frame, AudioBuffer, DecodeError};
pub use playback::{AudioClock, CompletionFn, NullSink, PlaybackScheduler, PlaybackSink, WallClock};
pub use sink::WavSink;
