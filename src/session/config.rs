use crate::audio::CaptureConfig;
use serde::{Deserialize, Serialize};

/// Configuration for a voice conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "practice-2026-08-06-es")
    pub session_id: String,

    /// Outbound capture format
    #[serde(skip)]
    pub capture: CaptureConfig,

    /// Sample rate of inbound assistant audio in Hz
    pub playback_rate: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("practice-{}", uuid::Uuid::new_v4()),
            capture: CaptureConfig::default(),
            playback_rate: 24000, // what the speech model emits
        }
    }
}
