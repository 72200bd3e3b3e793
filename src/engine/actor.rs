use chrono::Utc;
use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::{ActorStopReason, BoxError};
use kameo::message::{Context, Message};
use kameo::{Actor, mailbox::unbounded::UnboundedMailbox};
use tracing::{debug, info, warn};

use crate::analytics::broadcast::{BroadcastEvent, Broadcaster, MarketUpdate, ProfileSummary};
use crate::analytics::signal::{AdvisoryRequest, AdvisoryTap};
use crate::analytics::store::AnalyticsStore;
use crate::market::buffer::EventBuffer;
use crate::market::errors::MarketDataError;
use crate::market::structs::{AggregatedCandle, Candle, Trade};
use crate::order_flow::calculator::OrderFlowCalculator;
use crate::timeframe::{aggregate, Timeframe};
use crate::volume_profile::calculator::compute_volume_profile;
use super::structs::{EngineConfig, InstrumentStatistics, RecomputeOutcome};

/// Instrument actor requests
#[derive(Debug, Clone)]
pub enum InstrumentAsk {
    /// Append a closed candle and recompute every artifact
    IngestCandle(Candle),
    IngestTrade(Trade),
    GetRecentCandles { limit: usize },
    GetHistory { timeframe: Timeframe },
    GetStatistics,
}

#[derive(Debug, Clone)]
pub enum InstrumentReply {
    Recomputed(RecomputeOutcome),
    TradeAccepted,
    Rejected(MarketDataError),
    Candles(Vec<AggregatedCandle>),
    Statistics(InstrumentStatistics),
}

/// Single writer for one instrument.
///
/// Owns the candle and trade buffers plus the CVD history. Every candle triggers
/// a synchronous recompute whose results land in the shared store before the
/// reply is sent.
pub struct InstrumentActor {
    symbol: String,
    config: EngineConfig,
    candles: EventBuffer<Candle>,
    trades: EventBuffer<Trade>,
    order_flow: OrderFlowCalculator,
    store: AnalyticsStore,
    broadcaster: Broadcaster,
    advisory: AdvisoryTap,
    stats: InstrumentStatistics,
}

impl InstrumentActor {
    pub fn new(
        symbol: String,
        config: EngineConfig,
        store: AnalyticsStore,
        broadcaster: Broadcaster,
        advisory: AdvisoryTap,
    ) -> Self {
        let stats = InstrumentStatistics { symbol: symbol.clone(), ..Default::default() };
        Self {
            candles: EventBuffer::new(config.candle_capacity),
            trades: EventBuffer::new(config.trade_capacity),
            order_flow: OrderFlowCalculator::new(config.order_flow.clone()),
            symbol,
            config,
            store,
            broadcaster,
            advisory,
            stats,
        }
    }

    fn check_symbol(&self, event_symbol: &str) -> Result<(), MarketDataError> {
        if event_symbol != self.symbol {
            return Err(MarketDataError::SymbolMismatch {
                instrument: self.symbol.clone(),
                event: event_symbol.to_string(),
            });
        }
        Ok(())
    }

    fn ingest_candle(&mut self, candle: Candle) -> Result<RecomputeOutcome, MarketDataError> {
        self.check_symbol(&candle.symbol)?;
        candle.validate()?;

        if let Some(last) = self.candles.latest() {
            if candle.timestamp <= last.timestamp {
                return Err(MarketDataError::OutOfOrder {
                    timestamp: candle.timestamp,
                    last: last.timestamp,
                });
            }
        }

        self.stats.last_candle_timestamp = Some(candle.timestamp);
        self.candles.append(candle.clone());
        self.stats.candles_ingested += 1;

        Ok(self.recompute(&candle))
    }

    fn ingest_trade(&mut self, trade: Trade) -> Result<(), MarketDataError> {
        self.check_symbol(&trade.symbol)?;
        trade.validate()?;

        // Flag belongs to derived output only
        let mut trade = trade;
        trade.is_big_print = false;
        self.trades.append(trade);
        self.stats.trades_ingested += 1;
        Ok(())
    }

    fn recompute(&mut self, latest: &Candle) -> RecomputeOutcome {
        let mut outcome = RecomputeOutcome::default();
        self.stats.recomputes += 1;

        let window = self.config.volume_profile.current_window;
        let current_window = self.candles.recent(window);
        match compute_volume_profile(&self.symbol, &current_window, &self.config.volume_profile) {
            Ok(profile) => {
                self.store.put_current_profile(&self.symbol, profile);
                outcome.current_profile = true;
            }
            Err(reason) => {
                self.stats.unavailable_profiles += 1;
                debug!("{} current profile unavailable: {}", self.symbol, reason);
            }
        }

        let session_window = self.candles.snapshot();
        match compute_volume_profile(&self.symbol, &session_window, &self.config.volume_profile) {
            Ok(profile) => {
                self.store.put_session_profile(&self.symbol, profile);
                outcome.session_profile = true;
            }
            Err(reason) => {
                self.stats.unavailable_profiles += 1;
                debug!("{} session profile unavailable: {}", self.symbol, reason);
            }
        }

        let trade_window = self.config.order_flow.window_size.max(self.config.order_flow.min_trades);
        let recent_trades = self.trades.recent(trade_window);
        match self.order_flow.compute(&self.symbol, &recent_trades) {
            Ok(metrics) => {
                self.store.put_order_flow(&self.symbol, metrics);
                outcome.order_flow = true;
            }
            Err(reason) => {
                self.stats.unavailable_order_flow += 1;
                debug!("{} order flow unavailable: {}", self.symbol, reason);
            }
        }

        let Some(analytics) = self.store.snapshot(&self.symbol) else {
            return outcome;
        };
        let (Some(profile), Some(order_flow)) = (analytics.current_profile, analytics.order_flow) else {
            return outcome;
        };

        let update = MarketUpdate {
            symbol: self.symbol.clone(),
            timestamp: Utc::now().timestamp_millis(),
            latest_price: latest.close,
            volume_profile: ProfileSummary::from_profile(&profile, self.config.broadcast_levels),
            order_flow: order_flow.clone(),
        };
        outcome.delivered = self.broadcaster.publish(BroadcastEvent::MarketUpdate(update));

        outcome.advisory_queued = self.advisory.offer(AdvisoryRequest {
            symbol: self.symbol.clone(),
            candle: latest.clone(),
            current_profile: profile,
            order_flow,
        });

        outcome
    }

    fn statistics(&self) -> InstrumentStatistics {
        InstrumentStatistics {
            buffered_candles: self.candles.len(),
            buffered_trades: self.trades.len(),
            evicted_candles: self.candles.evicted(),
            evicted_trades: self.trades.evicted(),
            ..self.stats.clone()
        }
    }

    fn history(&self, timeframe: Timeframe) -> Vec<AggregatedCandle> {
        aggregate(&self.candles.snapshot(), timeframe.minutes())
    }
}

impl Actor for InstrumentActor {
    type Mailbox = UnboundedMailbox<Self>;

    fn name() -> &'static str {
        "InstrumentActor"
    }

    async fn on_start(&mut self, _actor_ref: ActorRef<Self>) -> Result<(), BoxError> {
        info!("🚀 Starting instrument actor for {} (candles: {}, trades: {})",
              self.symbol, self.candles.capacity(), self.trades.capacity());
        Ok(())
    }

    async fn on_stop(&mut self, _actor_ref: WeakActorRef<Self>, reason: ActorStopReason) -> Result<(), BoxError> {
        info!("🛑 Stopping instrument actor for {}: {:?}", self.symbol, reason);
        info!("📊 {} final statistics: {} candles, {} trades, {} rejected, {} recomputes",
              self.symbol, self.stats.candles_ingested, self.stats.trades_ingested,
              self.stats.rejected_events, self.stats.recomputes);
        Ok(())
    }
}

impl Message<InstrumentAsk> for InstrumentActor {
    type Reply = Result<InstrumentReply, String>;

    async fn handle(&mut self, msg: InstrumentAsk, _ctx: Context<'_, Self, Self::Reply>) -> Self::Reply {
        match msg {
            InstrumentAsk::IngestCandle(candle) => match self.ingest_candle(candle) {
                Ok(outcome) => Ok(InstrumentReply::Recomputed(outcome)),
                Err(e) => {
                    self.stats.rejected_events += 1;
                    warn!("⚠️ Rejected candle for {}: {}", self.symbol, e);
                    Ok(InstrumentReply::Rejected(e))
                }
            },
            InstrumentAsk::IngestTrade(trade) => match self.ingest_trade(trade) {
                Ok(()) => Ok(InstrumentReply::TradeAccepted),
                Err(e) => {
                    self.stats.rejected_events += 1;
                    warn!("⚠️ Rejected trade for {}: {}", self.symbol, e);
                    Ok(InstrumentReply::Rejected(e))
                }
            },
            InstrumentAsk::GetRecentCandles { limit } => {
                Ok(InstrumentReply::Candles(self.candles.recent(limit)))
            }
            InstrumentAsk::GetHistory { timeframe } => {
                Ok(InstrumentReply::Candles(self.history(timeframe)))
            }
            InstrumentAsk::GetStatistics => Ok(InstrumentReply::Statistics(self.statistics())),
        }
    }
}
