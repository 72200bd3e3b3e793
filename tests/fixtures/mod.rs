#![allow(dead_code)]

use analytics_feeder::analytics::{MarketState, SignalDirection, SignalModel, TradingSignal};
use analytics_feeder::engine::EngineConfig;
use analytics_feeder::market::{Candle, TimestampMS, Trade, TradeSide};

/// 2025-01-16 00:00:00 UTC, aligned to every supported timeframe
pub const BASE_TS: TimestampMS = 1_736_985_600_000;
pub const MINUTE: TimestampMS = 60_000;

/// One-minute candle around `price` with a 60% buy share
pub fn create_sample_candle(symbol: &str, minute: i64, price: f64, volume: f64) -> Candle {
    Candle::new(
        symbol,
        BASE_TS + minute * MINUTE,
        price,
        price + 1.0,
        price - 1.0,
        price + 0.5,
        volume,
        volume * 0.6,
    )
}

/// `count` consecutive candles walking up by `step`
pub fn create_candle_series(symbol: &str, count: usize, start_price: f64, step: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| create_sample_candle(symbol, i as i64, start_price + step * i as f64, 10.0))
        .collect()
}

pub fn create_sample_trade(symbol: &str, offset_ms: i64, price: f64, quantity: f64, side: TradeSide) -> Trade {
    Trade::new(symbol, BASE_TS + offset_ms, price, quantity, side)
}

/// Alternating buys and sells of unit size
pub fn create_trade_series(symbol: &str, count: usize, price: f64) -> Vec<Trade> {
    (0..count)
        .map(|i| {
            let side = if i % 2 == 0 { TradeSide::Buy } else { TradeSide::Sell };
            create_sample_trade(symbol, i as i64 * 100, price, 1.0, side)
        })
        .collect()
}

pub fn create_test_engine_config() -> EngineConfig {
    EngineConfig {
        candle_capacity: 120,
        trade_capacity: 500,
        subscriber_queue: 64,
        ..Default::default()
    }
}

pub fn create_sample_signal(symbol: &str) -> TradingSignal {
    TradingSignal {
        id: format!("{}-{}", symbol, BASE_TS),
        timestamp: BASE_TS,
        symbol: symbol.to_string(),
        direction: SignalDirection::Buy,
        model: SignalModel::MeanReversion,
        entry_price: 100.0,
        stop_loss: 98.0,
        take_profit: 106.0,
        confidence_score: 80,
        market_state: MarketState::Balance,
        key_level: "VAL 99.5".to_string(),
        order_flow: "CVD rising".to_string(),
        reasoning: "Rejection at value area low".to_string(),
        risk_reward: "1:3".to_string(),
        timeframe_confluence: "1m/5m aligned".to_string(),
    }
}
