use anyhow::{Context, Result};
use serde::Deserialize;

use crate::audio::format::DEFAULT_MIME_PREFERENCES;
use crate::audio::{CaptureConstraints, CaptureSource};
use crate::session::CaptureSettings;
use crate::transcode::DEFAULT_BITRATE_KBPS;

/// Environment overrides: `LOQA_RECORDER__UPLOAD__USER_ID=...`
pub const ENV_PREFIX: &str = "LOQA_RECORDER";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureConfig,
    pub transcode: TranscodeConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "loqa-recorder".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub sample_rate_hint: u32,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub timeslice_ms: u64,
    pub mime_preferences: Vec<String>,
    /// `microphone`, or a path to an audio file to replay
    pub source: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let constraints = CaptureConstraints::default();
        Self {
            sample_rate_hint: constraints.sample_rate_hint,
            echo_cancellation: constraints.echo_cancellation,
            noise_suppression: constraints.noise_suppression,
            timeslice_ms: constraints.timeslice_ms,
            mime_preferences: DEFAULT_MIME_PREFERENCES.iter().map(|m| m.to_string()).collect(),
            source: "microphone".to_string(),
        }
    }
}

impl CaptureConfig {
    pub fn settings(&self) -> CaptureSettings {
        CaptureSettings {
            constraints: CaptureConstraints {
                echo_cancellation: self.echo_cancellation,
                noise_suppression: self.noise_suppression,
                sample_rate_hint: self.sample_rate_hint,
                timeslice_ms: self.timeslice_ms,
            },
            mime_preferences: self.mime_preferences.clone(),
        }
    }

    pub fn source(&self) -> CaptureSource {
        CaptureSource::parse(&self.source)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub bitrate_kbps: u32,
    /// Default for submit requests that do not say
    pub convert_to_mp3: bool,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            convert_to_mp3: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub nats_url: String,
    pub subject_prefix: String,
    pub user_id: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            nats_url: "nats://localhost:4222".to_string(),
            subject_prefix: "recordings".to_string(),
            user_id: "anonymous".to_string(),
        }
    }
}

impl Config {
    /// Load `path` (extension optional) layered under `LOQA_RECORDER__*`
    /// environment overrides. A missing file is not an error.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid recorder configuration")
    }
}
