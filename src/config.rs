// src/config.rs

use crate::types::Language;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub poll_interval_secs: u64,
    pub commentary_interval_secs: u64,
    pub decision_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn commentary_interval(&self) -> Duration {
        Duration::from_secs(self.commentary_interval_secs)
    }

    pub fn decision_interval(&self) -> Duration {
        Duration::from_secs(self.decision_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    pub player_command: String,
    pub player_args: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub symbol: String,
    pub trade_volume: f64,
    pub default_language: Language,
    pub log_dir: String,
    pub timing: TimingConfig,
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Defaults, then an optional `Settings.*` file, then `APP_*` environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(Self::environment())
    }

    /// `APP_BASE_URL`, `APP_TIMING__POLL_INTERVAL_SECS`, `APP_AUDIO__PLAYER_ARGS="-a -b"`.
    fn environment() -> Environment {
        Environment::with_prefix("APP")
            .prefix_separator("_")
            .separator("__")
            .list_separator(" ")
            .with_list_parse_key("audio.player_args")
            .try_parsing(true)
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::with_name("Settings").required(false))
            .add_source(environment);

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("base_url", "http://127.0.0.1:5000")?
            .set_default("symbol", "XAUUSDm")?
            .set_default("trade_volume", 0.1)?
            .set_default("default_language", "en")?
            .set_default("log_dir", "logs")?
            .set_default("timing.poll_interval_secs", 5)?
            .set_default("timing.commentary_interval_secs", 5)?
            .set_default("timing.decision_interval_secs", 10)?
            .set_default("timing.request_timeout_secs", 10)?
            .set_default("audio.player_command", "ffplay")?
            .set_default(
                "audio.player_args",
                vec!["-nodisp", "-autoexit", "-loglevel", "quiet"],
            )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Message(format!("invalid base_url {}: {}", self.base_url, e)))?;

        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Message("symbol must not be empty".into()));
        }
        if !(self.trade_volume > 0.0) {
            return Err(ConfigError::Message(format!(
                "trade_volume must be positive, got {}",
                self.trade_volume
            )));
        }

        let t = &self.timing;
        for (name, value) in [
            ("poll_interval_secs", t.poll_interval_secs),
            ("commentary_interval_secs", t.commentary_interval_secs),
            ("decision_interval_secs", t.decision_interval_secs),
            ("request_timeout_secs", t.request_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Message(format!("timing.{} must be > 0", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_tests() -> Self {
        Self::defaults()
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .expect("defaults must deserialize")
    }
}
