use thiserror::Error;

/// Errors surfaced by the voice session and its collaborators.
///
/// Connection-phase errors (`Permission`, `Handshake`) are returned directly
/// from `start()`. Mid-session failures arrive as `Channel` through the
/// session's error callback after teardown has already run.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    #[error("capture source unavailable: {0}")]
    Permission(String),

    #[error("live channel handshake failed: {0}")]
    Handshake(String),

    #[error("live channel failed: {0}")]
    Channel(String),

    #[error("no active session")]
    NotActive,
}

impl SessionError {
    /// True for errors that end a session that was already Active.
    pub fn is_mid_session(&self) -> bool {
        matches!(self, SessionError::Channel(_))
    }
}
