use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::engine::handle::AnalyticsEngine;
use super::binance::{BinanceFeed, LiveFeedConfig};
use super::errors::FeedError;
use super::simulator::{MarketSimulator, SimulatorConfig};
use super::{FeedKind, InstrumentFeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    Idle,
    Running(FeedKind),
}

struct RunningFeed {
    kind: FeedKind,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<(), FeedError>>,
}

/// Owns the single active feed.
///
/// `start` refuses while a feed runs; `restart` stops and joins the current feed
/// before the next one is spawned, so two feeds never drive the engine at once.
pub struct FeedController {
    engine: AnalyticsEngine,
    simulator: SimulatorConfig,
    live: Option<LiveFeedConfig>,
    running: Option<RunningFeed>,
    state_tx: Arc<watch::Sender<FeedState>>,
}

impl FeedController {
    pub fn new(engine: AnalyticsEngine, simulator: SimulatorConfig, live: Option<LiveFeedConfig>) -> Self {
        let (state_tx, _) = watch::channel(FeedState::Idle);
        Self {
            engine,
            simulator,
            live,
            running: None,
            state_tx: Arc::new(state_tx),
        }
    }

    /// Follows start/stop transitions and feeds that end on their own
    pub fn watch_state(&self) -> watch::Receiver<FeedState> {
        self.state_tx.subscribe()
    }

    /// Idle, or the kind of the running feed. A feed whose task already ended
    /// reports Idle.
    pub fn state(&self) -> FeedState {
        match &self.running {
            Some(running) if !running.task.is_finished() && *self.state_tx.borrow() != FeedState::Idle => {
                FeedState::Running(running.kind)
            }
            _ => FeedState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state(), FeedState::Running(_))
    }

    /// Build the feed for `requested`, falling back to the simulator when the
    /// live feed has no usable configuration
    fn build_feed(&self, requested: FeedKind) -> Box<dyn InstrumentFeed> {
        match requested {
            FeedKind::Simulated => Box::new(MarketSimulator::new(self.simulator.clone())),
            FeedKind::Live => {
                let live = self
                    .live
                    .clone()
                    .ok_or_else(|| FeedError::Config("live feed not configured".to_string()))
                    .and_then(BinanceFeed::new);
                match live {
                    Ok(feed) => Box::new(feed) as Box<dyn InstrumentFeed>,
                    Err(e) => {
                        warn!("⚠️ Live feed unavailable ({}), falling back to simulated data", e);
                        Box::new(MarketSimulator::new(self.simulator.clone()))
                    }
                }
            }
        }
    }

    /// Start a feed; returns the kind actually started
    pub async fn start(&mut self, requested: FeedKind) -> Result<FeedKind, FeedError> {
        if let FeedState::Running(kind) = self.state() {
            return Err(FeedError::AlreadyRunning(kind.to_string()));
        }
        // Reap a feed that ended on its own
        if let Err(e) = self.stop().await {
            warn!("Previous feed ended with error: {}", e);
        }

        let feed = self.build_feed(requested);
        let kind = feed.kind();
        let symbols = feed.symbols();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Running must be published before the task can publish Idle
        self.state_tx.send_replace(FeedState::Running(kind));
        let state_tx = Arc::clone(&self.state_tx);
        let run = feed.run(self.engine.clone(), shutdown_rx);
        let task = tokio::spawn(async move {
            let result = run.await;
            if let Err(e) = &result {
                error!("❌ {} feed terminated: {}", kind, e);
            }
            state_tx.send_replace(FeedState::Idle);
            result
        });

        info!("▶️ Started {} feed for {:?}", kind, symbols);
        self.running = Some(RunningFeed { kind, shutdown: shutdown_tx, task });
        Ok(kind)
    }

    /// Signal the running feed to stop and wait for it; no-op when idle
    pub async fn stop(&mut self) -> Result<(), FeedError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        let _ = running.shutdown.send(true);
        self.state_tx.send_replace(FeedState::Idle);
        match running.task.await {
            Ok(Ok(())) => {
                info!("⏹️ Stopped {} feed", running.kind);
                Ok(())
            }
            Ok(Err(e)) => {
                error!("❌ {} feed ended with error: {}", running.kind, e);
                Err(e)
            }
            Err(e) => Err(FeedError::Task(e.to_string())),
        }
    }

    /// Stop whatever runs, then start `requested`
    pub async fn restart(&mut self, requested: FeedKind) -> Result<FeedKind, FeedError> {
        if let Err(e) = self.stop().await {
            warn!("Previous feed stopped with error: {}", e);
        }
        self.start(requested).await
    }
}
