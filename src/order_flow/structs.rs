use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::constants::{
    BIG_PRINT_MULTIPLIER, CVD_HISTORY_CAPACITY, DEFAULT_TRADE_WINDOW, MAX_BIG_PRINTS,
    MIN_ORDER_FLOW_TRADES,
};
use crate::market::structs::{TimestampMS, Trade};

/// Order flow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderFlowConfig {
    /// Most recent trades considered per computation
    pub window_size: usize,
    /// Minimum retained trades before metrics are produced
    pub min_trades: usize,
    /// Big print threshold as a multiple of the window's mean quantity
    pub big_print_multiplier: f64,
    /// Big prints reported per computation
    pub max_big_prints: usize,
    /// Stored CVD values per instrument
    pub cvd_history_capacity: usize,
}

impl Default for OrderFlowConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_TRADE_WINDOW,
            min_trades: MIN_ORDER_FLOW_TRADES,
            big_print_multiplier: BIG_PRINT_MULTIPLIER,
            max_big_prints: MAX_BIG_PRINTS,
            cvd_history_capacity: CVD_HISTORY_CAPACITY,
        }
    }
}

/// Direction of the latest CVD move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CvdTrend {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for CvdTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CvdTrend::Positive => write!(f, "positive"),
            CvdTrend::Negative => write!(f, "negative"),
            CvdTrend::Neutral => write!(f, "neutral"),
        }
    }
}

/// Order flow summary over the recent trade window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFlowMetrics {
    pub symbol: String,
    pub timestamp: TimestampMS,
    /// Cumulative volume delta of the window (buy qty minus sell qty)
    pub cvd: f64,
    pub cvd_trend: CvdTrend,
    /// Most recent oversized trades, timestamp ascending
    pub big_prints: Vec<Trade>,
    pub buy_notional: f64,
    pub sell_notional: f64,
    /// Buy share of notional, in [0, 100]
    pub imbalance_ratio: f64,
}

impl OrderFlowMetrics {
    pub fn total_notional(&self) -> f64 {
        self.buy_notional + self.sell_notional
    }

    pub fn is_buy_dominant(&self) -> bool {
        self.imbalance_ratio > 50.0
    }
}
