use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub capture: CaptureInputConfig,
    pub live: LiveConfig,
    pub session: SessionDirConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub capture_rate: u32,
    pub playback_rate: u32,
    pub frame_samples: usize,
}

#[derive(Debug, Deserialize)]
pub struct CaptureInputConfig {
    /// WAV file used as the scripted microphone input
    pub input_path: String,
}

#[derive(Debug, Deserialize)]
pub struct LiveConfig {
    pub nats_url: String,
    pub subject_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionDirConfig {
    /// Directory where per-session assistant audio is written
    pub output_dir: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
