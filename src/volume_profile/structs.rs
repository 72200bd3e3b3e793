use serde::{Deserialize, Serialize};

use crate::common::constants::{
    DEFAULT_BIN_COUNT, DEFAULT_CURRENT_WINDOW, HVN_FACTOR, LVN_FACTOR, MIN_PROFILE_CANDLES,
    VALUE_AREA_PERCENTAGE,
};
use crate::market::structs::TimestampMS;

/// Volume profile configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeProfileConfig {
    /// Number of equal-width price bins across the window range
    pub bin_count: usize,
    /// Candles used for the "current" profile
    pub current_window: usize,
    /// Minimum candles before a profile is produced
    pub min_candles: usize,
    /// Share of total volume the value area must cover
    pub value_area_percentage: f64,
    /// Bins below `lvn_factor * mean` are low-volume nodes
    pub lvn_factor: f64,
    /// Bins above `hvn_factor * mean` are high-volume nodes
    pub hvn_factor: f64,
}

impl Default for VolumeProfileConfig {
    fn default() -> Self {
        Self {
            bin_count: DEFAULT_BIN_COUNT,
            current_window: DEFAULT_CURRENT_WINDOW,
            min_candles: MIN_PROFILE_CANDLES,
            value_area_percentage: VALUE_AREA_PERCENTAGE,
            lvn_factor: LVN_FACTOR,
            hvn_factor: HVN_FACTOR,
        }
    }
}

/// One populated price bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfileLevel {
    /// Bin center
    pub price: f64,
    pub volume: f64,
    pub is_poc: bool,
    pub is_lvn: bool,
    pub is_hvn: bool,
}

/// Volume-at-price distribution for a candle window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    pub symbol: String,
    /// Computation time
    pub timestamp: TimestampMS,
    /// Point of control
    pub poc: f64,
    /// Value area high
    pub vah: f64,
    /// Value area low
    pub val: f64,
    /// Populated bins, price ascending
    pub levels: Vec<VolumeProfileLevel>,
    pub total_volume: f64,
    pub bin_width: f64,
    pub candle_count: usize,
}

impl VolumeProfile {
    pub fn poc_level(&self) -> Option<&VolumeProfileLevel> {
        self.levels.iter().find(|level| level.is_poc)
    }

    /// Whether `price` lies inside [val, vah]
    pub fn in_value_area(&self, price: f64) -> bool {
        price >= self.val && price <= self.vah
    }

    /// The first `limit` levels, price ascending
    pub fn top_levels(&self, limit: usize) -> Vec<VolumeProfileLevel> {
        self.levels.iter().take(limit).cloned().collect()
    }

    pub fn low_volume_nodes(&self) -> impl Iterator<Item = &VolumeProfileLevel> {
        self.levels.iter().filter(|level| level.is_lvn)
    }

    pub fn high_volume_nodes(&self) -> impl Iterator<Item = &VolumeProfileLevel> {
        self.levels.iter().filter(|level| level.is_hvn)
    }
}
