use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a voice conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: String,

    /// Current lifecycle state ("idle", "connecting", "active")
    pub state: String,

    /// When the session started, if it ever did
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds since the session started
    pub duration_secs: f64,

    /// Number of audio frames pumped to the speech model
    pub frames_sent: usize,

    /// Number of finalized turns in the transcript log
    pub turns_count: usize,
}
