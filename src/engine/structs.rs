use serde::{Deserialize, Serialize};

use crate::common::constants::{
    BROADCAST_TOP_LEVELS, DEFAULT_ADVISORY_QUEUE, DEFAULT_CANDLE_CAPACITY, DEFAULT_MIN_SIGNAL_CONFIDENCE,
    DEFAULT_SUBSCRIBER_QUEUE, DEFAULT_TRADE_CAPACITY,
};
use crate::market::structs::TimestampMS;
use crate::order_flow::structs::OrderFlowConfig;
use crate::volume_profile::structs::VolumeProfileConfig;

/// Settings shared by every instrument the engine drives
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub candle_capacity: usize,
    pub trade_capacity: usize,
    pub volume_profile: VolumeProfileConfig,
    pub order_flow: OrderFlowConfig,
    /// Per-subscriber queue length
    pub subscriber_queue: usize,
    /// Profile levels included in market updates
    pub broadcast_levels: usize,
    pub advisory_queue: usize,
    pub advisory_enabled: bool,
    /// Signals below this confidence are not broadcast
    pub min_signal_confidence: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            candle_capacity: DEFAULT_CANDLE_CAPACITY,
            trade_capacity: DEFAULT_TRADE_CAPACITY,
            volume_profile: VolumeProfileConfig::default(),
            order_flow: OrderFlowConfig::default(),
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
            broadcast_levels: BROADCAST_TOP_LEVELS,
            advisory_queue: DEFAULT_ADVISORY_QUEUE,
            advisory_enabled: false,
            min_signal_confidence: DEFAULT_MIN_SIGNAL_CONFIDENCE,
        }
    }
}

/// What a candle-triggered recompute produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeOutcome {
    pub current_profile: bool,
    pub session_profile: bool,
    pub order_flow: bool,
    /// Subscribers reached by the market update (0 when none was sent)
    pub delivered: usize,
    pub advisory_queued: bool,
}

/// Per-instrument counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentStatistics {
    pub symbol: String,
    pub candles_ingested: u64,
    pub trades_ingested: u64,
    pub rejected_events: u64,
    pub recomputes: u64,
    pub unavailable_profiles: u64,
    pub unavailable_order_flow: u64,
    pub buffered_candles: usize,
    pub buffered_trades: usize,
    pub evicted_candles: u64,
    pub evicted_trades: u64,
    pub last_candle_timestamp: Option<TimestampMS>,
}
