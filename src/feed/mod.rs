//! Event sources driving the engine
//!
//! Exactly one feed runs at a time. The `FeedController` owns it and guarantees
//! the previous feed has fully stopped before another starts.
pub mod binance;
pub mod controller;
pub mod errors;
pub mod simulator;

use std::fmt;
use std::str::FromStr;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::engine::handle::AnalyticsEngine;

pub use binance::{BinanceFeed, LiveFeedConfig};
pub use controller::{FeedController, FeedState};
pub use errors::FeedError;
pub use simulator::{MarketSimulator, SimulatorConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Simulated,
    Live,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Simulated => write!(f, "simulated"),
            FeedKind::Live => write!(f, "live"),
        }
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "simulator" => Ok(FeedKind::Simulated),
            "live" | "binance" => Ok(FeedKind::Live),
            other => Err(format!("Unknown feed kind '{}'", other)),
        }
    }
}

/// A source of candles and trades for a set of instruments.
///
/// `run` drives the engine until the shutdown flag flips to `true` or the source
/// fails for good.
pub trait InstrumentFeed: Send + 'static {
    fn kind(&self) -> FeedKind;

    fn symbols(&self) -> Vec<String>;

    fn run(
        self: Box<Self>,
        engine: AnalyticsEngine,
        shutdown: watch::Receiver<bool>,
    ) -> BoxFuture<'static, Result<(), FeedError>>;
}
