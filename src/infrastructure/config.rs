//! Configuration management
//!
//! Loads configuration from config.toml at startup. Every size and tuning
//! value reaches the components through their constructors; nothing here
//! is process-global.

use crate::{Result, XsError};
use serde::{Deserialize, Serialize};

/// Engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub universe: UniverseConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub signal: SignalConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

/// Universe sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UniverseConfig {
    /// Store capacity (asset ids are `0..num_assets`)
    #[serde(default = "default_num_assets")]
    pub num_assets: usize,

    #[serde(default = "default_num_sectors")]
    pub num_sectors: usize,

    /// Seed for the random sector assignment
    #[serde(default = "default_sector_seed")]
    pub sector_seed: u64,
}

/// What the producer does when the queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Retry with a yield until the tick fits. Lossless.
    #[default]
    SpinYield,
    /// Discard the tick and count it
    Drop,
}

/// What the consumer does when the queue is empty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdlePolicy {
    #[default]
    Yield,
    BusySpin,
}

/// Ingestion pipeline and synthetic source settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    #[serde(default)]
    pub backpressure: BackpressurePolicy,

    #[serde(default)]
    pub idle: IdlePolicy,

    #[serde(default = "default_initial_price")]
    pub initial_price: f32,

    /// Per-tick relative price step bound
    #[serde(default = "default_volatility")]
    pub volatility: f32,

    /// Absolute distance from price to bid and to ask
    #[serde(default = "default_spread")]
    pub spread: f32,

    #[serde(default = "default_min_volume")]
    pub min_volume: f32,

    #[serde(default = "default_max_volume")]
    pub max_volume: f32,

    /// Fixed RNG seed; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Live signal loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignalConfig {
    /// Pause between computation cycles in microseconds
    #[serde(default = "default_interval_us")]
    pub interval_us: u64,

    #[serde(default = "default_run_seconds")]
    pub run_seconds: u64,

    /// Time given to the feed before the first cycle
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,

    #[serde(default = "default_sector_neutral")]
    pub sector_neutral: bool,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            num_assets: default_num_assets(),
            num_sectors: default_num_sectors(),
            sector_seed: default_sector_seed(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            backpressure: BackpressurePolicy::default(),
            idle: IdlePolicy::default(),
            initial_price: default_initial_price(),
            volatility: default_volatility(),
            spread: default_spread(),
            min_volume: default_min_volume(),
            max_volume: default_max_volume(),
            seed: None,
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            interval_us: default_interval_us(),
            run_seconds: default_run_seconds(),
            warmup_ms: default_warmup_ms(),
            sector_neutral: default_sector_neutral(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_api_port(),
        }
    }
}

fn default_num_assets() -> usize {
    2048
}

fn default_num_sectors() -> usize {
    10
}

fn default_sector_seed() -> u64 {
    42
}

fn default_queue_capacity() -> usize {
    4096
}

fn default_initial_price() -> f32 {
    100.0
}

fn default_volatility() -> f32 {
    0.001
}

fn default_spread() -> f32 {
    0.01
}

fn default_min_volume() -> f32 {
    1.0
}

fn default_max_volume() -> f32 {
    100.0
}

fn default_interval_us() -> u64 {
    100
}

fn default_run_seconds() -> u64 {
    10
}

fn default_warmup_ms() -> u64 {
    100
}

fn default_sector_neutral() -> bool {
    true
}

fn default_api_port() -> u16 {
    5000
}

impl Config {
    /// Load configuration from `$CONFIG_PATH` (default `config.toml`)
    ///
    /// If the file doesn't exist, returns default configuration.
    /// # Errors
    /// Returns error if the file exists but cannot be read, parsed or
    /// validated.
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %config_path, "Config file not found, using defaults");
                Ok(Config::default())
            }
            Err(e) => Err(XsError::Io(e)),
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).map_err(|e| XsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component could run with
    pub fn validate(&self) -> Result<()> {
        if self.feed.queue_capacity == 0 {
            return Err(XsError::Config("feed.queue_capacity must be > 0".into()));
        }
        if self.universe.num_assets > 0 && self.universe.num_sectors == 0 {
            return Err(XsError::Config(
                "universe.num_sectors must be > 0 when assets are configured".into(),
            ));
        }
        if self.universe.num_assets > u32::MAX as usize {
            return Err(XsError::Config("universe.num_assets exceeds u32 ids".into()));
        }
        if !(self.feed.min_volume <= self.feed.max_volume) {
            return Err(XsError::Config(
                "feed.min_volume must not exceed feed.max_volume".into(),
            ));
        }
        if !(self.feed.initial_price > 0.0) {
            return Err(XsError::Config("feed.initial_price must be positive".into()));
        }
        Ok(())
    }
}
