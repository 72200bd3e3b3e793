use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::market::structs::{Candle, TimestampMS};
use crate::order_flow::structs::OrderFlowMetrics;
use crate::volume_profile::structs::VolumeProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalDirection {
    Buy,
    Sell,
}

/// Setup family the advisor matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalModel {
    TrendContinuation,
    MeanReversion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketState {
    Balance,
    Imbalance,
}

/// Trade idea produced by the external signal advisor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub id: String,
    pub timestamp: TimestampMS,
    pub symbol: String,
    #[serde(rename = "signal_type")]
    pub direction: SignalDirection,
    pub model: SignalModel,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// 0-100
    pub confidence_score: u8,
    pub market_state: MarketState,
    pub key_level: String,
    pub order_flow: String,
    pub reasoning: String,
    pub risk_reward: String,
    pub timeframe_confluence: String,
}

impl TradingSignal {
    /// Reward over risk from the entry, stop and target prices
    pub fn risk_reward_ratio(&self) -> Option<f64> {
        let risk = (self.entry_price - self.stop_loss).abs();
        let reward = (self.take_profit - self.entry_price).abs();
        if risk > 0.0 && risk.is_finite() && reward.is_finite() {
            Some(reward / risk)
        } else {
            None
        }
    }

    /// Stop and target sit on the correct sides of the entry
    pub fn has_valid_levels(&self) -> bool {
        match self.direction {
            SignalDirection::Buy => self.stop_loss < self.entry_price && self.entry_price < self.take_profit,
            SignalDirection::Sell => self.take_profit < self.entry_price && self.entry_price < self.stop_loss,
        }
    }

    /// Confident enough to publish
    pub fn is_actionable(&self, min_confidence: u8) -> bool {
        self.confidence_score >= min_confidence && self.has_valid_levels()
    }
}

/// Analytics handed to the signal advisor after a recompute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    pub symbol: String,
    pub candle: Candle,
    pub current_profile: VolumeProfile,
    pub order_flow: OrderFlowMetrics,
}

#[derive(Debug)]
struct AdvisoryTapInner {
    enabled: AtomicBool,
    sender: mpsc::Sender<AdvisoryRequest>,
    dropped: AtomicU64,
}

/// Non-blocking, switchable hand-off of recompute results to the advisor.
///
/// Requests go through a bounded channel; when the advisor falls behind the
/// newest request is dropped rather than stalling the instrument.
#[derive(Debug, Clone)]
pub struct AdvisoryTap {
    inner: Arc<AdvisoryTapInner>,
}

impl AdvisoryTap {
    pub fn new(capacity: usize, enabled: bool) -> (Self, mpsc::Receiver<AdvisoryRequest>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let tap = Self {
            inner: Arc::new(AdvisoryTapInner {
                enabled: AtomicBool::new(enabled),
                sender,
                dropped: AtomicU64::new(0),
            }),
        };
        (tap, receiver)
    }

    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.inner.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!("🤖 Signal advisory {}", if enabled { "enabled" } else { "disabled" });
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Requests dropped because the channel was full
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Queue a request if the tap is enabled. Returns whether it was queued.
    pub fn offer(&self, request: AdvisoryRequest) -> bool {
        if !self.is_enabled() {
            return false;
        }

        match self.inner.sender.try_send(request) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(request)) => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Advisory queue full, dropping request for {}", request.symbol);
                false
            }
            Err(mpsc::error::TrySendError::Closed(request)) => {
                debug!("Advisory consumer gone, discarding request for {}", request.symbol);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_flow::structs::CvdTrend;

    fn signal(direction: SignalDirection, entry: f64, stop: f64, target: f64, confidence: u8) -> TradingSignal {
        TradingSignal {
            id: "sig-1".to_string(),
            timestamp: 1_736_985_600_000,
            symbol: "BTCUSDT".to_string(),
            direction,
            model: SignalModel::TrendContinuation,
            entry_price: entry,
            stop_loss: stop,
            take_profit: target,
            confidence_score: confidence,
            market_state: MarketState::Imbalance,
            key_level: "VAH".to_string(),
            order_flow: "CVD rising".to_string(),
            reasoning: "Acceptance above value".to_string(),
            risk_reward: "1:2".to_string(),
            timeframe_confluence: "1m".to_string(),
        }
    }

    fn request() -> AdvisoryRequest {
        let candle = Candle::new("BTCUSDT", 0, 100.0, 101.0, 99.0, 100.5, 10.0, 6.0);
        AdvisoryRequest {
            symbol: "BTCUSDT".to_string(),
            candle,
            current_profile: VolumeProfile {
                symbol: "BTCUSDT".to_string(),
                timestamp: 0,
                poc: 100.0,
                vah: 101.0,
                val: 99.0,
                levels: Vec::new(),
                total_volume: 10.0,
                bin_width: 0.1,
                candle_count: 10,
            },
            order_flow: OrderFlowMetrics {
                symbol: "BTCUSDT".to_string(),
                timestamp: 0,
                cvd: 1.0,
                cvd_trend: CvdTrend::Positive,
                big_prints: Vec::new(),
                buy_notional: 1.0,
                sell_notional: 0.0,
                imbalance_ratio: 100.0,
            },
        }
    }

    #[test]
    fn test_signal_actionability() {
        let long = signal(SignalDirection::Buy, 100.0, 98.0, 104.0, 75);
        assert!(long.is_actionable(70));
        assert!(!long.is_actionable(80));
        assert_eq!(long.risk_reward_ratio(), Some(2.0));

        let bad_short = signal(SignalDirection::Sell, 100.0, 98.0, 104.0, 90);
        assert!(!bad_short.has_valid_levels());
        assert!(!bad_short.is_actionable(70));
    }

    #[test]
    fn test_signal_serialization_labels() {
        let json = serde_json::to_value(signal(SignalDirection::Sell, 100.0, 102.0, 96.0, 70)).unwrap();
        assert_eq!(json["signal_type"], "SELL");
        assert_eq!(json["model"], "TREND_CONTINUATION");
        assert_eq!(json["market_state"], "IMBALANCE");
    }

    #[tokio::test]
    async fn test_tap_respects_toggle() {
        let (tap, mut receiver) = AdvisoryTap::new(4, false);
        assert!(!tap.offer(request()));

        tap.set_enabled(true);
        assert!(tap.offer(request()));
        let received = receiver.recv().await.unwrap();
        assert_eq!(received.symbol, "BTCUSDT");
    }

    #[tokio::test]
    async fn test_tap_drops_when_full() {
        let (tap, _receiver) = AdvisoryTap::new(1, true);
        assert!(tap.offer(request()));
        assert!(!tap.offer(request()));
        assert_eq!(tap.dropped(), 1);
    }
}
