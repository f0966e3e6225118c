use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::devices::FileDevices;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transport: TransportConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub devices: DevicesConfig,
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
pub struct TransportConfig {
    pub nats_url: String,
    pub subject_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct DevicesConfig {
    pub microphone_wav: PathBuf,
    pub speaker_wav: PathBuf,
    pub screen_image: PathBuf,
}

impl DevicesConfig {
    pub fn file_devices(&self) -> FileDevices {
        FileDevices {
            microphone_wav: self.microphone_wav.clone(),
            speaker_wav: self.speaker_wav.clone(),
            screen_image: self.screen_image.clone(),
        }
    }
}

impl Config {
    /// Load `path` (any format the `config` crate recognises) with
    /// `LIVE_GUIDE__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(
                config::Environment::with_prefix("LIVE_GUIDE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}
