//! Voice conversation session management
//!
//! This module provides the `VoiceSession` abstraction that manages:
//! - Capture of fixed-size microphone frames
//! - Encoding and pumping frames to the live speech channel
//! - Demultiplexing inbound audio, transcription, and control events
//! - Turn assembly into an ordered transcript log
//! - Idempotent teardown shared by stop, close, and error paths

mod config;
mod session;
mod stats;
mod transcript;

pub use config::SessionConfig;
pub use session::{ErrorHook, UsageHook, VoiceSession, VoiceSessionBuilder};
pub use stats::SessionStats;
pub use transcript::{Speaker, Turn, TurnAccumulator};
