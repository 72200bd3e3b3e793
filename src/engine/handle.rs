use std::sync::Arc;

use kameo::actor::ActorRef;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::analytics::broadcast::{BroadcastEvent, Broadcaster, SignalUpdate, SubscriberId, Subscription};
use crate::analytics::signal::{AdvisoryRequest, AdvisoryTap, TradingSignal};
use crate::analytics::store::AnalyticsStore;
use crate::market::structs::{validate_symbol, AggregatedCandle, Candle, Trade};
use crate::order_flow::structs::OrderFlowMetrics;
use crate::timeframe::Timeframe;
use crate::volume_profile::structs::VolumeProfile;
use super::actor::{InstrumentActor, InstrumentAsk, InstrumentReply};
use super::errors::EngineError;
use super::structs::{EngineConfig, InstrumentStatistics, RecomputeOutcome};

struct EngineInner {
    config: EngineConfig,
    store: AnalyticsStore,
    broadcaster: Broadcaster,
    advisory: AdvisoryTap,
    instruments: RwLock<FxHashMap<String, ActorRef<InstrumentActor>>>,
}

/// Entry point to the analytics core.
///
/// Routes events to one actor per instrument (spawned on first use) and serves
/// reads from the shared store. Cheap to clone.
#[derive(Clone)]
pub struct AnalyticsEngine {
    inner: Arc<EngineInner>,
}

impl AnalyticsEngine {
    /// Build an engine and the receiving end of its advisory tap
    pub fn new(config: EngineConfig) -> (Self, mpsc::Receiver<AdvisoryRequest>) {
        let store = AnalyticsStore::new();
        let broadcaster = Broadcaster::new(config.subscriber_queue);
        Self::with_parts(config, store, broadcaster)
    }

    /// Build an engine around an existing store and broadcaster
    pub fn with_parts(
        config: EngineConfig,
        store: AnalyticsStore,
        broadcaster: Broadcaster,
    ) -> (Self, mpsc::Receiver<AdvisoryRequest>) {
        let (advisory, receiver) = AdvisoryTap::new(config.advisory_queue, config.advisory_enabled);
        let engine = Self {
            inner: Arc::new(EngineInner {
                config,
                store,
                broadcaster,
                advisory,
                instruments: RwLock::new(FxHashMap::default()),
            }),
        };
        (engine, receiver)
    }

    pub fn store(&self) -> AnalyticsStore {
        self.inner.store.clone()
    }

    pub fn broadcaster(&self) -> Broadcaster {
        self.inner.broadcaster.clone()
    }

    /// Append a closed candle; returns once every artifact has been recomputed
    pub async fn ingest_candle(&self, instrument: &str, candle: Candle) -> Result<RecomputeOutcome, EngineError> {
        match self.ask(instrument, InstrumentAsk::IngestCandle(candle)).await? {
            InstrumentReply::Recomputed(outcome) => Ok(outcome),
            InstrumentReply::Rejected(e) => Err(EngineError::Rejected(e)),
            other => Err(EngineError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    pub async fn ingest_trade(&self, instrument: &str, trade: Trade) -> Result<(), EngineError> {
        match self.ask(instrument, InstrumentAsk::IngestTrade(trade)).await? {
            InstrumentReply::TradeAccepted => Ok(()),
            InstrumentReply::Rejected(e) => Err(EngineError::Rejected(e)),
            other => Err(EngineError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    pub fn get_current_profile(&self, instrument: &str) -> Option<VolumeProfile> {
        self.inner.store.current_profile(instrument)
    }

    pub fn get_session_profile(&self, instrument: &str) -> Option<VolumeProfile> {
        self.inner.store.session_profile(instrument)
    }

    pub fn get_order_flow(&self, instrument: &str) -> Option<OrderFlowMetrics> {
        self.inner.store.order_flow(instrument)
    }

    /// Last `limit` candles, oldest first; empty for unknown instruments
    pub async fn get_recent_candles(&self, instrument: &str, limit: usize) -> Vec<Candle> {
        self.query_candles(instrument, InstrumentAsk::GetRecentCandles { limit }).await
    }

    /// Retained candles re-bucketed into `timeframe`
    pub async fn get_history(&self, instrument: &str, timeframe: Timeframe) -> Vec<AggregatedCandle> {
        self.query_candles(instrument, InstrumentAsk::GetHistory { timeframe }).await
    }

    pub async fn get_statistics(&self, instrument: &str) -> Option<InstrumentStatistics> {
        let actor_ref = self.existing(instrument).await?;
        match actor_ref.ask(InstrumentAsk::GetStatistics).await {
            Ok(InstrumentReply::Statistics(stats)) => Some(stats),
            Ok(_) => None,
            Err(e) => {
                warn!("Statistics request for {} failed: {}", instrument, e);
                None
            }
        }
    }

    /// Instruments with a live actor, sorted
    pub async fn instruments(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.inner.instruments.read().await.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn subscribe(&self) -> Subscription {
        self.inner.broadcaster.subscribe()
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.broadcaster.unsubscribe(id)
    }

    /// Broadcast an advisor-built signal; returns the delivery count.
    ///
    /// Signals under the configured confidence, or with stop/target on the
    /// wrong side of the entry, are dropped.
    pub fn publish_signal(&self, signal: TradingSignal) -> usize {
        if !signal.is_actionable(self.inner.config.min_signal_confidence) {
            warn!("Discarding {:?} signal for {} (confidence {}, valid levels {})",
                  signal.direction, signal.symbol, signal.confidence_score, signal.has_valid_levels());
            return 0;
        }
        info!("🎯 Publishing {:?} signal for {} (confidence {}, R:R {:?})",
              signal.direction, signal.symbol, signal.confidence_score, signal.risk_reward_ratio());
        self.inner.broadcaster.publish(BroadcastEvent::NewSignal(SignalUpdate {
            symbol: signal.symbol.clone(),
            signal,
        }))
    }

    pub fn set_advisory_enabled(&self, enabled: bool) {
        self.inner.advisory.set_enabled(enabled);
    }

    pub fn advisory_enabled(&self) -> bool {
        self.inner.advisory.is_enabled()
    }

    /// Stop an instrument's actor and forget its analytics
    pub async fn remove_instrument(&self, instrument: &str) -> bool {
        let removed = self.inner.instruments.write().await.remove(instrument);
        self.inner.store.remove(instrument);
        match removed {
            Some(actor_ref) => {
                if let Err(e) = actor_ref.stop_gracefully().await {
                    warn!("Failed to stop actor for {}: {}", instrument, e);
                }
                info!("🗑️ Removed instrument {}", instrument);
                true
            }
            None => false,
        }
    }

    /// Stop every instrument actor
    pub async fn shutdown(&self) {
        let actors: Vec<(String, ActorRef<InstrumentActor>)> =
            self.inner.instruments.write().await.drain().collect();
        info!("🛑 Stopping {} instrument actors", actors.len());
        for (symbol, actor_ref) in actors {
            if let Err(e) = actor_ref.stop_gracefully().await {
                warn!("Failed to stop actor for {}: {}", symbol, e);
            }
        }
    }

    async fn ask(&self, instrument: &str, msg: InstrumentAsk) -> Result<InstrumentReply, EngineError> {
        validate_symbol(instrument)?;
        let actor_ref = self.actor_for(instrument).await;

        actor_ref.ask(msg).await.map_err(|e| {
            error!("❌ Instrument actor for {} failed: {}", instrument, e);
            EngineError::InstrumentUnavailable {
                symbol: instrument.to_string(),
                reason: e.to_string(),
            }
        })
    }

    async fn query_candles(&self, instrument: &str, msg: InstrumentAsk) -> Vec<AggregatedCandle> {
        let Some(actor_ref) = self.existing(instrument).await else {
            return Vec::new();
        };
        match actor_ref.ask(msg).await {
            Ok(InstrumentReply::Candles(candles)) => candles,
            Ok(other) => {
                warn!("Unexpected candle reply for {}: {:?}", instrument, other);
                Vec::new()
            }
            Err(e) => {
                warn!("Candle query for {} failed: {}", instrument, e);
                Vec::new()
            }
        }
    }

    async fn existing(&self, instrument: &str) -> Option<ActorRef<InstrumentActor>> {
        self.inner
            .instruments
            .read()
            .await
            .get(instrument)
            .filter(|actor_ref| actor_ref.is_alive())
            .cloned()
    }

    /// Live actor for `instrument`, spawning or respawning as needed
    async fn actor_for(&self, instrument: &str) -> ActorRef<InstrumentActor> {
        if let Some(actor_ref) = self.existing(instrument).await {
            return actor_ref;
        }

        let mut instruments = self.inner.instruments.write().await;
        match instruments.get(instrument) {
            Some(actor_ref) if actor_ref.is_alive() => return actor_ref.clone(),
            Some(_) => {
                warn!("⚠️ Instrument actor for {} died, respawning with empty state", instrument);
                self.inner.store.remove(instrument);
            }
            None => debug!("Spawning instrument actor for {}", instrument),
        }

        let actor = InstrumentActor::new(
            instrument.to_string(),
            self.inner.config.clone(),
            self.inner.store.clone(),
            self.inner.broadcaster.clone(),
            self.inner.advisory.clone(),
        );
        let actor_ref = kameo::spawn(actor);
        instruments.insert(instrument.to_string(), actor_ref.clone());
        actor_ref
    }
}
