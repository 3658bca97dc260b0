pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod live;
pub mod session;

pub use audio::{
    decode_frame, encode_frame, AudioBuffer, AudioClock, CaptureConfig, CaptureFrame,
    CaptureSource, DecodeError, NullSink, PlaybackScheduler, PlaybackSink, WallClock,
    WavFileSource, WavSink,
};
pub use config::Config;
pub use error::SessionError;
pub use http::{create_router, AppState};
pub use live::{
    AudioMessage, ChannelEvent, LiveChannel, LiveConnector, MediaBlob, NatsConnector,
    ServerMessage, TextMessage, TranscriptionFragment,
};
pub use session::{
    SessionConfig, SessionStats, Speaker, Turn, VoiceSession, VoiceSessionBuilder,
};
