use super::messages::{AudioMessage, ServerMessage, TextMessage};
use crate::error::SessionError;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Events delivered by an open live channel.
///
/// The transport's open/close/error callbacks are folded into this one
/// stream so the session has a single teardown path to wire.
#[derive(Debug)]
pub enum ChannelEvent {
    /// A demultiplexable inbound message
    Message(ServerMessage),
    /// The channel closed normally
    Closed,
    /// The channel failed mid-session
    Failed(String),
}

/// An open bidirectional channel to the speech model.
///
/// Sends are fire-and-forget: they do not await delivery, and the audio
/// stream is loss-tolerant by contract.
#[async_trait::async_trait]
pub trait LiveChannel: Send + Sync {
    /// Send one encoded audio frame
    async fn send_audio(&self, message: AudioMessage) -> Result<(), SessionError>;

    /// Send typed text input, outside the audio frame loop
    async fn send_text(&self, text: &str) -> Result<(), SessionError>;

    /// Best-effort close; must not fail loudly
    async fn close(&self);
}

/// Opens live channels. The handshake happens here; a successful connect
/// yields the channel handle plus the inbound event stream.
#[async_trait::async_trait]
pub trait LiveConnector: Send + Sync {
    async fn connect(
        &self,
        session_id: &str,
    ) -> Result<(Arc<dyn LiveChannel>, mpsc::Receiver<ChannelEvent>), SessionError>;
}

/// Live channel transport over NATS subjects.
///
/// Outbound frames and text are published to per-session subjects; the
/// speech model's events arrive on the matching server subject.
pub struct NatsConnector {
    url: String,
    subject_prefix: String,
}

impl NatsConnector {
    pub fn new(url: impl Into<String>, subject_prefix: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subject_prefix: subject_prefix.into(),
        }
    }
}

#[async_trait::async_trait]
impl LiveConnector for NatsConnector {
    async fn connect(
        &self,
        session_id: &str,
    ) -> Result<(Arc<dyn LiveChannel>, mpsc::Receiver<ChannelEvent>), SessionError> {
        info!("Connecting live channel via NATS at {}", self.url);

        let client = async_nats::connect(&self.url)
            .await
            .map_err(|e| SessionError::Handshake(e.to_string()))?;

        let server_subject = format!("{}.server.{}", self.subject_prefix, session_id);
        let mut subscriber = client
            .subscribe(server_subject.clone())
            .await
            .map_err(|e| SessionError::Handshake(e.to_string()))?;

        info!("Live channel open, listening on {}", server_subject);

        let (event_tx, event_rx) = mpsc::channel(64);

        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<ServerMessage>(&msg.payload) {
                    Ok(message) => {
                        if event_tx.send(ChannelEvent::Message(message)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        // One malformed message must not end the session
                        warn!("Dropping unparseable server message: {}", e);
                    }
                }
            }

            let _ = event_tx.send(ChannelEvent::Closed).await;
        });

        let channel = NatsChannel {
            client,
            audio_subject: format!("{}.audio.{}", self.subject_prefix, session_id),
            text_subject: format!("{}.text.{}", self.subject_prefix, session_id),
        };

        Ok((Arc::new(channel), event_rx))
    }
}

struct NatsChannel {
    client: async_nats::Client,
    audio_subject: String,
    text_subject: String,
}

#[async_trait::async_trait]
impl LiveChannel for NatsChannel {
    async fn send_audio(&self, message: AudioMessage) -> Result<(), SessionError> {
        let payload =
            serde_json::to_vec(&message).map_err(|e| SessionError::Channel(e.to_string()))?;

        self.client
            .publish(self.audio_subject.clone(), payload.into())
            .await
            .map_err(|e| SessionError::Channel(e.to_string()))
    }

    async fn send_text(&self, text: &str) -> Result<(), SessionError> {
        let payload = serde_json::to_vec(&TextMessage {
            text: text.to_string(),
        })
        .map_err(|e| SessionError::Channel(e.to_string()))?;

        self.client
            .publish(self.text_subject.clone(), payload.into())
            .await
            .map_err(|e| SessionError::Channel(e.to_string()))
    }

    async fn close(&self) {
        // async-nats flushes and cleans up on drop
        if let Err(e) = self.client.flush().await {
            warn!("Live channel flush on close failed: {}", e);
        }
    }
}
