use chrono::Utc;
use tracing::debug;

use crate::common::constants::NEUTRAL_IMBALANCE;
use crate::common::errors::Unavailable;
use crate::market::buffer::EventBuffer;
use crate::market::structs::{Trade, TradeSide};
use super::structs::{CvdTrend, OrderFlowConfig, OrderFlowMetrics};

/// Per-instrument order flow calculator.
///
/// Owns the bounded CVD history, so each instrument needs its own instance.
#[derive(Debug, Clone)]
pub struct OrderFlowCalculator {
    config: OrderFlowConfig,
    cvd_history: EventBuffer<f64>,
}

impl OrderFlowCalculator {
    pub fn new(config: OrderFlowConfig) -> Self {
        let cvd_history = EventBuffer::new(config.cvd_history_capacity);
        Self { config, cvd_history }
    }

    /// Stored CVD values, oldest first
    pub fn cvd_history(&self) -> Vec<f64> {
        self.cvd_history.snapshot()
    }

    /// Summarize the last `window_size` of `trades` (time ascending).
    ///
    /// A successful computation appends its CVD to the history; the trend compares
    /// it to the value stored before it.
    pub fn compute(&mut self, symbol: &str, trades: &[Trade]) -> Result<OrderFlowMetrics, Unavailable> {
        if trades.len() < self.config.min_trades || trades.is_empty() {
            return Err(Unavailable::InsufficientTrades {
                got: trades.len(),
                need: self.config.min_trades.max(1),
            });
        }

        let start = trades.len().saturating_sub(self.config.window_size.max(1));
        let window = &trades[start..];

        let mean_quantity = window.iter().map(|t| t.quantity).sum::<f64>() / window.len() as f64;
        let threshold = mean_quantity * self.config.big_print_multiplier;

        let mut cvd = 0.0;
        let mut buy_notional = 0.0;
        let mut sell_notional = 0.0;
        let mut big_prints = Vec::new();

        for trade in window {
            cvd += trade.signed_quantity();
            match trade.side {
                TradeSide::Buy => buy_notional += trade.notional(),
                TradeSide::Sell => sell_notional += trade.notional(),
            }

            if trade.quantity >= threshold {
                let mut big_print = trade.clone();
                big_print.is_big_print = true;
                big_prints.push(big_print);
            }
        }

        big_prints.sort_by_key(|t| t.timestamp);
        let excess = big_prints.len().saturating_sub(self.config.max_big_prints);
        big_prints.drain(..excess);

        self.cvd_history.append(cvd);
        let cvd_trend = self.trend();

        let notional = buy_notional + sell_notional;
        let imbalance_ratio = if notional > 0.0 {
            buy_notional / notional * 100.0
        } else {
            NEUTRAL_IMBALANCE
        };

        debug!("{} order flow: CVD {:.4} ({}), imbalance {:.2}%, {} big prints",
               symbol, cvd, cvd_trend, imbalance_ratio, big_prints.len());

        Ok(OrderFlowMetrics {
            symbol: symbol.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            cvd,
            cvd_trend,
            big_prints,
            buy_notional,
            sell_notional,
            imbalance_ratio,
        })
    }

    fn trend(&self) -> CvdTrend {
        match (self.cvd_history.latest(), self.cvd_history.previous()) {
            (Some(latest), Some(previous)) if latest > previous => CvdTrend::Positive,
            (Some(latest), Some(previous)) if latest < previous => CvdTrend::Negative,
            _ => CvdTrend::Neutral,
        }
    }
}

impl Default for OrderFlowCalculator {
    fn default() -> Self {
        Self::new(OrderFlowConfig::default())
    }
}
