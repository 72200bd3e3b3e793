use std::f64::consts::TAU;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::common::constants::{DEFAULT_SYMBOLS, MILLISECONDS_PER_MINUTE};
use crate::engine::handle::AnalyticsEngine;
use crate::market::structs::{Candle, TimestampMS, Trade, TradeSide};
use super::errors::FeedError;
use super::{FeedKind, InstrumentFeed};

/// Synthetic market configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub symbols: Vec<String>,
    /// One trade per symbol per tick
    pub tick_interval_ms: u64,
    /// Wall-clock seconds between simulated candles
    pub candle_interval_secs: u64,
    /// Candle close-to-close standard deviation as a share of price
    pub volatility: f64,
    /// Trade price standard deviation as a share of price
    pub trade_deviation: f64,
    pub big_trade_probability: f64,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            tick_interval_ms: 1_000,
            candle_interval_secs: 10,
            volatility: 0.002,
            trade_deviation: 0.0005,
            big_trade_probability: 0.05,
            seed: None,
        }
    }
}

/// Starting price for a symbol
pub fn base_price(symbol: &str) -> f64 {
    match symbol {
        "BTCUSDT" => 42_000.0,
        "ETHUSDT" => 2_200.0,
        "LTCUSDT" => 68.0,
        "DOGEUSDT" => 0.08,
        _ => 100.0,
    }
}

/// Decimals that keep a few significant digits at the given price scale
fn price_decimals(price: f64) -> i32 {
    if price >= 1_000.0 {
        2
    } else if price >= 1.0 {
        4
    } else {
        6
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone)]
struct SymbolState {
    symbol: String,
    price: f64,
    /// Simulated candles advance one minute each
    next_candle_at: TimestampMS,
}

/// Random-walk market generator for demos and tests
pub struct MarketSimulator {
    config: SimulatorConfig,
    rng: StdRng,
    states: Vec<SymbolState>,
}

impl MarketSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let now = Utc::now().timestamp_millis();
        let start = now - now.rem_euclid(MILLISECONDS_PER_MINUTE);
        Self::with_rng(config, rng, start)
    }

    fn with_rng(config: SimulatorConfig, rng: StdRng, start: TimestampMS) -> Self {
        let states = config
            .symbols
            .iter()
            .map(|symbol| SymbolState {
                symbol: symbol.clone(),
                price: base_price(symbol),
                next_candle_at: start,
            })
            .collect();
        Self { config, rng, states }
    }

    /// Standard normal sample (Box-Muller)
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }

    /// Next candle for the symbol at `idx`; moves its price to the close
    fn next_candle(&mut self, idx: usize) -> Candle {
        let current = self.states[idx].price;
        let sigma = current * self.config.volatility;

        let open = current;
        let mut close = current + self.gaussian() * sigma;
        if close <= 0.0 {
            close = current;
        }
        let high = open.max(close) + (self.gaussian() * sigma / 2.0).abs();
        let low = (open.min(close) - (self.gaussian() * sigma / 2.0).abs()).max(current * 0.5);

        let volume = round_to(self.rng.gen_range(100.0..500.0), 2);
        let buy_volume = round_to(volume * self.rng.gen_range(0.4..0.6), 2);

        let decimals = price_decimals(current);
        let close = round_to(close, decimals);

        let state = &mut self.states[idx];
        state.price = close;
        let timestamp = state.next_candle_at;
        state.next_candle_at += MILLISECONDS_PER_MINUTE;

        Candle::new(
            state.symbol.clone(),
            timestamp,
            round_to(open, decimals),
            round_to(high, decimals),
            round_to(low, decimals),
            close,
            volume,
            buy_volume,
        )
    }

    fn next_trade(&mut self, idx: usize, timestamp: TimestampMS) -> Trade {
        let current = self.states[idx].price;
        let mut price = current + self.gaussian() * current * self.config.trade_deviation;
        if price <= 0.0 {
            price = current;
        }

        let mut quantity = self.rng.gen_range(0.01..2.0);
        if self.rng.gen_bool(self.config.big_trade_probability.clamp(0.0, 1.0)) {
            quantity *= self.rng.gen_range(5.0..15.0);
        }
        let side = if self.rng.gen_bool(0.5) { TradeSide::Buy } else { TradeSide::Sell };

        Trade::new(
            self.states[idx].symbol.clone(),
            timestamp,
            round_to(price, price_decimals(current)),
            round_to(quantity, 4).max(0.0001),
            side,
        )
    }

    /// One tick: a trade per symbol, plus a candle per symbol when `with_candles`
    pub fn tick(&mut self, timestamp: TimestampMS, with_candles: bool) -> (Vec<Candle>, Vec<Trade>) {
        let mut candles = Vec::new();
        let mut trades = Vec::with_capacity(self.states.len());
        for idx in 0..self.states.len() {
            if with_candles {
                candles.push(self.next_candle(idx));
            }
            trades.push(self.next_trade(idx, timestamp));
        }
        (candles, trades)
    }

    /// Continue after whatever the engine already holds, so a restarted feed
    /// never replays candle times
    async fn resume_from(&mut self, engine: &AnalyticsEngine) {
        for state in &mut self.states {
            if let Some(last) = engine.get_recent_candles(&state.symbol, 1).await.pop() {
                if last.timestamp >= state.next_candle_at {
                    state.next_candle_at = last.timestamp + MILLISECONDS_PER_MINUTE;
                    state.price = last.close;
                    debug!("{} simulation resumes at {} from {}", state.symbol, state.next_candle_at, last.close);
                }
            }
        }
    }

    async fn drive(mut self, engine: AnalyticsEngine, mut shutdown: watch::Receiver<bool>) -> Result<(), FeedError> {
        self.resume_from(&engine).await;

        let tick_every = Duration::from_millis(self.config.tick_interval_ms.max(1));
        let ticks_per_candle = (self.config.candle_interval_secs.saturating_mul(1_000) / self.config.tick_interval_ms.max(1)).max(1);
        let mut interval = tokio::time::interval(tick_every);
        let mut tick_count: u64 = 0;

        info!("🎲 Simulated feed started for {} symbols (candle every {}s)",
              self.states.len(), self.config.candle_interval_secs);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            let with_candles = tick_count % ticks_per_candle == 0;
            tick_count += 1;

            let (candles, trades) = self.tick(Utc::now().timestamp_millis(), with_candles);
            for trade in trades {
                let symbol = trade.symbol.clone();
                if let Err(e) = engine.ingest_trade(&symbol, trade).await {
                    warn!("Simulated trade for {} rejected: {}", symbol, e);
                }
            }
            for candle in candles {
                let symbol = candle.symbol.clone();
                match engine.ingest_candle(&symbol, candle).await {
                    Ok(outcome) => debug!("Simulated candle for {} recomputed: {:?}", symbol, outcome),
                    Err(e) => warn!("Simulated candle for {} rejected: {}", symbol, e),
                }
            }
        }

        info!("🛑 Simulated feed stopped after {} ticks", tick_count);
        Ok(())
    }
}

impl InstrumentFeed for MarketSimulator {
    fn kind(&self) -> FeedKind {
        FeedKind::Simulated
    }

    fn symbols(&self) -> Vec<String> {
        self.states.iter().map(|s| s.symbol.clone()).collect()
    }

    fn run(
        self: Box<Self>,
        engine: AnalyticsEngine,
        shutdown: watch::Receiver<bool>,
    ) -> BoxFuture<'static, Result<(), FeedError>> {
        (*self).drive(engine, shutdown).boxed()
    }
}
