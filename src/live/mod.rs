pub mod channel;
pub mod messages;

pub use channel::{ChannelEvent, LiveChannel, LiveConnector, NatsConnector};
pub use messages::{AudioMessage, MediaBlob, ServerMessage, TextMessage, TranscriptionFragment};
