//! Trade-level order flow: cumulative volume delta, its trend, buy/sell notional
//! imbalance and big print detection.
pub mod calculator;
pub mod structs;

pub use calculator::OrderFlowCalculator;
pub use structs::{CvdTrend, OrderFlowConfig, OrderFlowMetrics};
