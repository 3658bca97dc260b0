use crate::config::Config;
use crate::session::VoiceSession;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for HTTP handlers
///
/// Holds at most one live session; the controller supports exactly one
/// active conversation per client.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<RwLock<Option<Arc<VoiceSession>>>>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            session: Arc::new(RwLock::new(None)),
        }
    }
}
