//! HTTP API for external control (the tutoring front end)
//!
//! This module provides a REST API for controlling the voice session:
//! - POST /session/start - Start the conversation
//! - POST /session/stop - Stop it and collect stats
//! - POST /session/text - Typed fallback input
//! - GET /session/status - Query session statistics
//! - GET /session/transcript - Get the accumulated transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
