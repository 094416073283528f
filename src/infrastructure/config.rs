use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::telemetry::DEFAULT_HISTORY_CAP;

const CONFIG_FILE: &str = "config/netpulse";
const ENV_PREFIX: &str = "NETPULSE";
const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub simulator: SimulatorSettings,
    #[serde(default)]
    pub gemini: GeminiSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulatorSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Fixed RNG seed, for reproducible demos.
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_model() -> String {
    "gemini-pro".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            history_cap: default_history_cap(),
            seed: None,
        }
    }
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        self.bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.bind))
    }
}

impl SimulatorSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn rng(&self) -> fastrand::Rng {
        match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        }
    }
}

impl GeminiSettings {
    /// The API key is required; running without one is a startup error.
    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => anyhow::bail!(
                "Missing Gemini API key: set {} or {}__GEMINI__API_KEY",
                API_KEY_ENV,
                ENV_PREFIX
            ),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Load `config/netpulse.*` (optional), then `NETPULSE__*` environment overrides.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    build_config(builder, std::env::var(API_KEY_ENV).ok())
}

fn build_config(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    api_key: Option<String>,
) -> anyhow::Result<AppConfig> {
    let settings = builder
        .set_override_option("gemini.api_key", api_key)?
        .build()
        .context("Failed to read configuration")?;

    let config: AppConfig = settings
        .try_deserialize()
        .context("Failed to parse configuration")?;
    config.gemini.require_api_key()?;

    if config.simulator.interval_ms == 0 {
        anyhow::bail!("simulator.interval_ms must be greater than zero");
    }
    if config.simulator.history_cap == 0 {
        anyhow::bail!("simulator.history_cap must be greater than zero");
    }

    Ok(config)
}
