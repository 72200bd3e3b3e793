use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::order_flow::structs::OrderFlowMetrics;
use crate::volume_profile::structs::VolumeProfile;

/// Latest derived artifacts for one instrument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentAnalytics {
    pub current_profile: Option<VolumeProfile>,
    pub session_profile: Option<VolumeProfile>,
    pub order_flow: Option<OrderFlowMetrics>,
}

/// Shared keyed store of the latest analytics per instrument.
///
/// Cloning yields another handle to the same map. Each slot is overwritten on
/// write, never appended, and the lock is held only for a single insert or read.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsStore {
    inner: Arc<RwLock<FxHashMap<String, InstrumentAnalytics>>>,
}

impl AnalyticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_current_profile(&self, symbol: &str, profile: VolumeProfile) {
        self.inner.write().entry(symbol.to_string()).or_default().current_profile = Some(profile);
    }

    pub fn put_session_profile(&self, symbol: &str, profile: VolumeProfile) {
        self.inner.write().entry(symbol.to_string()).or_default().session_profile = Some(profile);
    }

    pub fn put_order_flow(&self, symbol: &str, metrics: OrderFlowMetrics) {
        self.inner.write().entry(symbol.to_string()).or_default().order_flow = Some(metrics);
    }

    pub fn current_profile(&self, symbol: &str) -> Option<VolumeProfile> {
        self.inner.read().get(symbol).and_then(|a| a.current_profile.clone())
    }

    pub fn session_profile(&self, symbol: &str) -> Option<VolumeProfile> {
        self.inner.read().get(symbol).and_then(|a| a.session_profile.clone())
    }

    pub fn order_flow(&self, symbol: &str) -> Option<OrderFlowMetrics> {
        self.inner.read().get(symbol).and_then(|a| a.order_flow.clone())
    }

    /// All three artifacts for `symbol` read under one lock
    pub fn snapshot(&self, symbol: &str) -> Option<InstrumentAnalytics> {
        self.inner.read().get(symbol).cloned()
    }

    /// Instruments with at least one stored artifact, sorted
    pub fn instruments(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.inner.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Forget everything stored for `symbol`
    pub fn remove(&self, symbol: &str) -> Option<InstrumentAnalytics> {
        self.inner.write().remove(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order_flow::structs::CvdTrend;

    fn profile(symbol: &str, poc: f64) -> VolumeProfile {
        VolumeProfile {
            symbol: symbol.to_string(),
            timestamp: 0,
            poc,
            vah: poc + 1.0,
            val: poc - 1.0,
            levels: Vec::new(),
            total_volume: 10.0,
            bin_width: 0.5,
            candle_count: 10,
        }
    }

    fn metrics(symbol: &str, cvd: f64) -> OrderFlowMetrics {
        OrderFlowMetrics {
            symbol: symbol.to_string(),
            timestamp: 0,
            cvd,
            cvd_trend: CvdTrend::Neutral,
            big_prints: Vec::new(),
            buy_notional: 0.0,
            sell_notional: 0.0,
            imbalance_ratio: 50.0,
        }
    }

    #[test]
    fn test_unknown_instrument_reads_none() {
        let store = AnalyticsStore::new();
        assert!(store.current_profile("BTCUSDT").is_none());
        assert!(store.order_flow("BTCUSDT").is_none());
        assert!(store.snapshot("BTCUSDT").is_none());
        assert!(store.instruments().is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let store = AnalyticsStore::new();
        store.put_current_profile("BTCUSDT", profile("BTCUSDT", 100.0));
        store.put_current_profile("BTCUSDT", profile("BTCUSDT", 105.0));
        store.put_order_flow("BTCUSDT", metrics("BTCUSDT", 1.0));

        assert_eq!(store.current_profile("BTCUSDT").unwrap().poc, 105.0);
        assert!(store.session_profile("BTCUSDT").is_none());
        assert_eq!(store.order_flow("BTCUSDT").unwrap().cvd, 1.0);
    }

    #[test]
    fn test_clones_share_state() {
        let store = AnalyticsStore::new();
        let handle = store.clone();
        handle.put_session_profile("ETHUSDT", profile("ETHUSDT", 2200.0));
        store.put_order_flow("BTCUSDT", metrics("BTCUSDT", -3.0));

        assert_eq!(store.session_profile("ETHUSDT").unwrap().poc, 2200.0);
        assert_eq!(handle.instruments(), vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]);

        assert!(store.remove("ETHUSDT").is_some());
        assert!(handle.session_profile("ETHUSDT").is_none());
    }
}
