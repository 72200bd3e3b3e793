//! `config.toml` loading
//!
//! Every section is optional; absent keys fall back to the engine defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::common::constants::{
    BROADCAST_TOP_LEVELS, DEFAULT_ADVISORY_QUEUE, DEFAULT_CANDLE_CAPACITY, DEFAULT_MIN_SIGNAL_CONFIDENCE,
    DEFAULT_SUBSCRIBER_QUEUE, DEFAULT_SYMBOLS, DEFAULT_TRADE_CAPACITY,
};
use crate::engine::structs::EngineConfig;
use crate::feed::{FeedKind, LiveFeedConfig, SimulatorConfig};
use crate::health::HealthConfig;
use crate::logging::LoggingConfig;
use crate::market::structs::normalize_symbols;
use crate::order_flow::structs::OrderFlowConfig;
use crate::volume_profile::structs::VolumeProfileConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Feed started at boot
    pub feed: FeedKind,
    /// Instruments driven by whichever feed runs
    pub symbols: Vec<String>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            feed: FeedKind::Simulated,
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub candle_capacity: usize,
    pub trade_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            candle_capacity: DEFAULT_CANDLE_CAPACITY,
            trade_capacity: DEFAULT_TRADE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    pub subscriber_queue: usize,
    pub max_levels: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
            max_levels: BROADCAST_TOP_LEVELS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub enabled: bool,
    pub queue_capacity: usize,
    /// Minimum confidence (0-100) for a published signal
    pub min_confidence: u8,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            queue_capacity: DEFAULT_ADVISORY_QUEUE,
            min_confidence: DEFAULT_MIN_SIGNAL_CONFIDENCE,
        }
    }
}

/// Full `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub application: ApplicationConfig,
    pub buffers: BufferConfig,
    pub volume_profile: VolumeProfileConfig,
    pub order_flow: OrderFlowConfig,
    pub broadcast: BroadcastConfig,
    pub advisory: AdvisoryConfig,
    pub simulator: SimulatorConfig,
    /// Absent section means no live feed is available
    pub live: Option<LiveFeedConfig>,
    pub logging: LoggingConfig,
    pub health: HealthConfig,
}

impl AppConfig {
    /// Load from `path`; a missing file yields the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("⚠️ Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig = toml::from_str(content)?;
        config.application.symbols = normalize_symbols(&config.application.symbols)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg.to_string())) };

        if self.application.symbols.is_empty() {
            return invalid("application.symbols must not be empty");
        }
        if self.buffers.candle_capacity == 0 || self.buffers.trade_capacity == 0 {
            return invalid("buffer capacities must be positive");
        }
        if self.volume_profile.bin_count == 0 {
            return invalid("volume_profile.bin_count must be positive");
        }
        if self.volume_profile.current_window == 0 {
            return invalid("volume_profile.current_window must be positive");
        }
        let pct = self.volume_profile.value_area_percentage;
        if !(pct > 0.0 && pct <= 100.0) {
            return invalid("volume_profile.value_area_percentage must be in (0, 100]");
        }
        if self.order_flow.window_size == 0 || self.order_flow.cvd_history_capacity == 0 {
            return invalid("order_flow window and history capacity must be positive");
        }
        if self.broadcast.subscriber_queue == 0 {
            return invalid("broadcast.subscriber_queue must be positive");
        }
        if self.advisory.queue_capacity == 0 {
            return invalid("advisory.queue_capacity must be positive");
        }
        if self.advisory.min_confidence > 100 {
            return invalid("advisory.min_confidence must be at most 100");
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            candle_capacity: self.buffers.candle_capacity,
            trade_capacity: self.buffers.trade_capacity,
            volume_profile: self.volume_profile.clone(),
            order_flow: self.order_flow.clone(),
            subscriber_queue: self.broadcast.subscriber_queue,
            broadcast_levels: self.broadcast.max_levels,
            advisory_queue: self.advisory.queue_capacity,
            advisory_enabled: self.advisory.enabled,
            min_signal_confidence: self.advisory.min_confidence,
        }
    }

    /// Simulator settings driving the application symbols
    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            symbols: self.application.symbols.clone(),
            ..self.simulator.clone()
        }
    }

    /// Live settings, with the application symbols when the section names none
    pub fn live_config(&self) -> Option<LiveFeedConfig> {
        self.live.clone().map(|mut live| {
            if live.symbols.is_empty() {
                live.symbols = self.application.symbols.clone();
            }
            live
        })
    }
}
