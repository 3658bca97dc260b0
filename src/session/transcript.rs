use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker attribution for a finalized turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One finalized span of the conversation from a single speaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Accumulates transcription fragments for the turn in progress.
///
/// User and assistant text build up independently and flush together on
/// the turn-complete signal, user first. An empty accumulator produces no
/// turn rather than a blank one.
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    user: String,
    assistant: String,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, fragment: &str) {
        self.user.push_str(fragment);
    }

    pub fn push_assistant(&mut self, fragment: &str) {
        self.assistant.push_str(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.assistant.is_empty()
    }

    /// Drain both accumulators into finalized turns, user first.
    pub fn flush(&mut self) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(2);

        if !self.user.is_empty() {
            turns.push(Turn::new(Speaker::User, std::mem::take(&mut self.user)));
        }

        if !self.assistant.is_empty() {
            turns.push(Turn::new(
                Speaker::Assistant,
                std::mem::take(&mut self.assistant),
            ));
        }

        turns
    }
}
