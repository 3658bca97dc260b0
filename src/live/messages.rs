use serde::{Deserialize, Serialize};

/// Base64 audio payload with its declared format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaBlob {
    /// Base64-encoded 16-bit PCM bytes
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Outbound audio frame, one per captured frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioMessage {
    pub media: MediaBlob,
}

impl AudioMessage {
    pub fn pcm(data: String, sample_rate: u32) -> Self {
        Self {
            media: MediaBlob {
                data,
                mime_type: format!("audio/pcm;rate={}", sample_rate),
            },
        }
    }
}

/// Outbound typed-input message, sent outside the audio frame loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextMessage {
    pub text: String,
}

/// A fragment of streamed transcription text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionFragment {
    pub text: String,
}

/// One inbound message from the speech model.
///
/// Fields are independently optional and may co-occur in a single message;
/// every present field must be handled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Assistant speech audio, implicitly 24 kHz mono PCM
    #[serde(rename = "inlineData", default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<MediaBlob>,

    /// Speech-to-text of the user's own voice
    #[serde(
        rename = "inputTranscription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub input_transcription: Option<TranscriptionFragment>,

    /// Text of the assistant's spoken reply
    #[serde(
        rename = "outputTranscription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_transcription: Option<TranscriptionFragment>,

    /// Both speakers' turns are complete; accumulators flush
    #[serde(rename = "turnComplete", default)]
    pub turn_complete: bool,

    /// Server-side barge-in detection; playback must stop immediately
    #[serde(default)]
    pub interrupted: bool,
}
