use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tutor_voice::{create_router, AppState, Config};

#[derive(Parser, Debug)]
#[command(name = "tutor-voice", about = "Voice conversation service for Tutor 360 IA")]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(long, default_value = "config/tutor-voice")]
    config: String,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let bind = args.bind.unwrap_or_else(|| cfg.service.http.bind.clone());
    let port = args.port.unwrap_or(cfg.service.http.port);

    info!("{} starting", cfg.service.name);
    info!("Live channel: {}", cfg.live.nats_url);
    info!("Capture input: {}", cfg.capture.input_path);

    let state = AppState::new(Arc::new(cfg));
    let router = create_router(state);

    let addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP API listening on {}", addr);

    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
