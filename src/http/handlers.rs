use super::state::AppState;
use crate::audio::{CaptureConfig, WavFileSource, WavSink};
use crate::error::SessionError;
use crate::live::NatsConnector;
use crate::session::{SessionConfig, SessionStats, Turn, VoiceSession};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub stats: SessionStats,
}

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start the voice conversation session
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("practice-{}", uuid::Uuid::new_v4()));

    info!("Starting voice session: {}", session_id);

    {
        let slot = state.session.read().await;
        if let Some(existing) = slot.as_ref() {
            if existing.is_active() {
                return (
                    StatusCode::CONFLICT,
                    Json(ErrorResponse {
                        error: format!("Session {} is already live", existing.session_id()),
                    }),
                )
                    .into_response();
            }
        }
    }

    let session = match build_session(&state, session_id.clone()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to build session: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to build session: {}", e),
                }),
            )
                .into_response();
        }
    };

    if let Err(e) = session.start().await {
        error!("Failed to start session: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to start session: {}", e),
            }),
        )
            .into_response();
    }

    {
        let mut slot = state.session.write().await;
        *slot = Some(session);
    }

    info!("Voice session started: {}", session_id);

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id,
            status: "active".to_string(),
        }),
    )
        .into_response()
}

/// POST /session/stop
/// Stop the live session
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = {
        let mut slot = state.session.write().await;
        slot.take()
    };

    match session {
        Some(session) => {
            let stats = session.stop().await;
            info!("Voice session stopped: {}", session.session_id());
            (
                StatusCode::OK,
                Json(StopSessionResponse {
                    session_id: session.session_id().to_string(),
                    status: "stopped".to_string(),
                    stats,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No session to stop".to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /session/text
/// Send typed input as a user turn
pub async fn send_text(
    State(state): State<AppState>,
    Json(req): Json<SendTextRequest>,
) -> impl IntoResponse {
    let session = {
        let slot = state.session.read().await;
        slot.clone()
    };

    match session {
        Some(session) => match session.send_text(&req.text).await {
            Ok(()) => (StatusCode::OK, "OK").into_response(),
            Err(SessionError::NotActive) => (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: "Session is not active".to_string(),
                }),
            )
                .into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to send text: {}", e),
                }),
            )
                .into_response(),
        },
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/status
/// Get statistics for the current session
pub async fn session_status(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.session.read().await;

    match slot.as_ref() {
        Some(session) => (StatusCode::OK, Json(session.stats())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /session/transcript
/// Get the transcript accumulated so far
pub async fn session_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let slot = state.session.read().await;

    match slot.as_ref() {
        Some(session) => {
            let transcript: Vec<Turn> = session.transcript();
            (StatusCode::OK, Json(transcript)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No session".to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Wiring
// ============================================================================

fn build_session(state: &AppState, session_id: String) -> anyhow::Result<VoiceSession> {
    let cfg = &state.config;

    let capture_config = CaptureConfig {
        sample_rate: cfg.audio.capture_rate,
        channels: 1,
        frame_samples: cfg.audio.frame_samples,
    };

    let session_config = SessionConfig {
        session_id: session_id.clone(),
        capture: capture_config.clone(),
        playback_rate: cfg.audio.playback_rate,
    };

    let capture = WavFileSource::new(&cfg.capture.input_path, capture_config);
    let connector = NatsConnector::new(&cfg.live.nats_url, &cfg.live.subject_prefix);

    let sink_path = std::path::Path::new(&cfg.session.output_dir).join(format!("{}.wav", session_id));
    let sink = WavSink::create(sink_path, cfg.audio.playback_rate, 1)?;

    VoiceSession::builder(session_config)
        .capture(Box::new(capture))
        .connector(Arc::new(connector))
        .sink(Arc::new(sink))
        .on_usage(Arc::new(|stats| {
            info!(
                "Session {} consumed {:.0}s of practice time",
                stats.session_id, stats.duration_secs
            );
        }))
        .on_error(Arc::new(|err| {
            error!("Session ended by channel failure: {}", err);
        }))
        .build()
}
