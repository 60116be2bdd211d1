use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub submission: SubmissionConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Preferred capture rate; the device default wins when unsupported
    pub sample_rate: u32,
    pub channels: u16,
    /// Replay this WAV file instead of opening the microphone
    #[serde(default)]
    pub input_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SubmissionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub state_dir: String,
}

impl StorageConfig {
    pub fn state_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_dir).into_owned())
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("STORY_RECORDER").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
