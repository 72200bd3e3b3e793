use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::common::constants::{
    BINANCE_STREAM_BASE_URL, DEFAULT_RECONNECTION_DELAY_SECONDS, WEBSOCKET_KLINE_SUFFIX,
    WEBSOCKET_TRADE_SUFFIX,
};
use crate::engine::handle::AnalyticsEngine;
use crate::market::errors::MarketDataError;
use crate::market::structs::{normalize_symbols, Candle, Trade, TradeSide};
use super::errors::FeedError;
use super::{FeedKind, InstrumentFeed};

/// Live exchange feed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveFeedConfig {
    pub base_url: String,
    pub symbols: Vec<String>,
    pub reconnect_delay_secs: u64,
    /// 0 retries forever
    pub max_reconnect_attempts: u32,
}

impl Default for LiveFeedConfig {
    fn default() -> Self {
        Self {
            base_url: BINANCE_STREAM_BASE_URL.to_string(),
            symbols: Vec::new(),
            reconnect_delay_secs: DEFAULT_RECONNECTION_DELAY_SECONDS,
            max_reconnect_attempts: 0,
        }
    }
}

impl LiveFeedConfig {
    /// Upper-cased symbols, or an error when the feed could not run
    pub fn validated_symbols(&self) -> Result<Vec<String>, FeedError> {
        if self.base_url.trim().is_empty() {
            return Err(FeedError::Config("empty base_url".to_string()));
        }
        if self.symbols.is_empty() {
            return Err(FeedError::Config("no symbols configured".to_string()));
        }
        Ok(normalize_symbols(&self.symbols)?)
    }
}

/// Combined stream envelope: `{"stream": "...", "data": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct CombinedStreamMessage {
    pub stream: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BinanceKlineEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "k")]
    pub kline: BinanceKline,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BinanceKline {
    /// Kline start time
    #[serde(rename = "t")]
    pub start_time: i64,
    #[serde(rename = "o")]
    pub open: String,
    #[serde(rename = "h")]
    pub high: String,
    #[serde(rename = "l")]
    pub low: String,
    #[serde(rename = "c")]
    pub close: String,
    #[serde(rename = "v")]
    pub volume: String,
    /// Taker buy base asset volume
    #[serde(rename = "V")]
    pub taker_buy_volume: String,
    #[serde(rename = "x")]
    pub is_closed: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BinanceTradeEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "q")]
    pub quantity: String,
    #[serde(rename = "T")]
    pub trade_time: i64,
    /// Buyer was the maker, so the seller crossed the spread
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
}

fn parse_number(field: &str, value: &str) -> Result<f64, MarketDataError> {
    value
        .parse::<f64>()
        .map_err(|_| MarketDataError::Parse(format!("Invalid {}: {}", field, value)))
}

impl BinanceKlineEvent {
    /// Closed klines only; an open kline yields `Ok(None)`
    pub fn to_candle(&self) -> Result<Option<Candle>, MarketDataError> {
        if !self.kline.is_closed {
            return Ok(None);
        }
        let k = &self.kline;
        Ok(Some(Candle::new(
            self.symbol.to_uppercase(),
            k.start_time,
            parse_number("open", &k.open)?,
            parse_number("high", &k.high)?,
            parse_number("low", &k.low)?,
            parse_number("close", &k.close)?,
            parse_number("volume", &k.volume)?,
            parse_number("taker buy volume", &k.taker_buy_volume)?,
        )))
    }
}

impl BinanceTradeEvent {
    pub fn to_trade(&self) -> Result<Trade, MarketDataError> {
        let side = if self.buyer_is_maker { TradeSide::Sell } else { TradeSide::Buy };
        Ok(Trade::new(
            self.symbol.to_uppercase(),
            self.trade_time,
            parse_number("price", &self.price)?,
            parse_number("quantity", &self.quantity)?,
            side,
        ))
    }
}

/// Market event decoded from one combined-stream frame
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Candle(Candle),
    Trade(Trade),
}

/// Decode a combined-stream text frame. Open klines and unknown streams give `None`.
pub fn parse_stream_message(text: &str) -> Result<Option<LiveEvent>, FeedError> {
    let message: CombinedStreamMessage = serde_json::from_str(text)?;

    if message.stream.ends_with(WEBSOCKET_KLINE_SUFFIX) {
        let event: BinanceKlineEvent = serde_json::from_value(message.data)?;
        Ok(event.to_candle()?.map(LiveEvent::Candle))
    } else if message.stream.ends_with(WEBSOCKET_TRADE_SUFFIX) {
        let event: BinanceTradeEvent = serde_json::from_value(message.data)?;
        Ok(Some(LiveEvent::Trade(event.to_trade()?)))
    } else {
        debug!("Ignoring message from stream {}", message.stream);
        Ok(None)
    }
}

/// Binance combined kline + trade stream
pub struct BinanceFeed {
    config: LiveFeedConfig,
    symbols: Vec<String>,
    messages_received: u64,
    parse_errors: u64,
    /// Failures since the last established connection
    failed_attempts: u32,
}

impl BinanceFeed {
    pub fn new(config: LiveFeedConfig) -> Result<Self, FeedError> {
        let symbols = config.validated_symbols()?;
        Ok(Self {
            config,
            symbols,
            messages_received: 0,
            parse_errors: 0,
            failed_attempts: 0,
        })
    }

    pub fn build_url(&self) -> String {
        let streams: Vec<String> = self
            .symbols
            .iter()
            .flat_map(|symbol| {
                let lower = symbol.to_lowercase();
                [
                    format!("{}{}", lower, WEBSOCKET_KLINE_SUFFIX),
                    format!("{}{}", lower, WEBSOCKET_TRADE_SUFFIX),
                ]
            })
            .collect();
        format!("{}/stream?streams={}", self.config.base_url.trim_end_matches('/'), streams.join("/"))
    }

    async fn drive(mut self, engine: AnalyticsEngine, mut shutdown: watch::Receiver<bool>) -> Result<(), FeedError> {
        let delay = Duration::from_secs(self.config.reconnect_delay_secs);

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.connect_and_stream(&engine, &mut shutdown).await {
                Ok(()) => break,
                Err(e) => {
                    self.failed_attempts += 1;
                    error!("❌ Live feed error: {}", e);
                    let max = self.config.max_reconnect_attempts;
                    if max > 0 && self.failed_attempts >= max {
                        error!("💥 Giving up after {} consecutive failed attempts", self.failed_attempts);
                        return Err(e);
                    }
                    warn!("🔄 Reconnecting in {:?} (attempt {})", delay, self.failed_attempts);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        info!("🛑 Live feed stopped ({} messages, {} parse errors)", self.messages_received, self.parse_errors);
        Ok(())
    }

    /// Stream until shutdown (`Ok`) or a connection failure (`Err`)
    async fn connect_and_stream(
        &mut self,
        engine: &AnalyticsEngine,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), FeedError> {
        let url = self.build_url();
        info!("🔌 Connecting to live feed: {}", url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        info!("✅ Connected to live feed for {} symbols", self.symbols.len());
        if self.failed_attempts > 0 {
            info!("🔁 Reconnected after {} failed attempts", self.failed_attempts);
            self.failed_attempts = 0;
        }

        let (_, mut read) = ws_stream.split();

        loop {
            let msg = tokio::select! {
                msg = read.next() => msg,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                    continue;
                }
            };

            match msg {
                Some(Ok(Message::Text(text))) => self.handle_text(engine, &text).await,
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    return Err(FeedError::Closed(reason));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(FeedError::WebSocket(e)),
                None => return Err(FeedError::Closed("stream ended".to_string())),
            }
        }
    }

    async fn handle_text(&mut self, engine: &AnalyticsEngine, text: &str) {
        self.messages_received += 1;

        match parse_stream_message(text) {
            Ok(Some(LiveEvent::Candle(candle))) => {
                let symbol = candle.symbol.clone();
                if let Err(e) = engine.ingest_candle(&symbol, candle).await {
                    warn!("Live candle for {} rejected: {}", symbol, e);
                }
            }
            Ok(Some(LiveEvent::Trade(trade))) => {
                let symbol = trade.symbol.clone();
                if let Err(e) = engine.ingest_trade(&symbol, trade).await {
                    debug!("Live trade for {} rejected: {}", symbol, e);
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.parse_errors += 1;
                if self.parse_errors <= 5 {
                    warn!("Failed to parse live feed message: {}", e);
                }
            }
        }
    }
}

impl InstrumentFeed for BinanceFeed {
    fn kind(&self) -> FeedKind {
        FeedKind::Live
    }

    fn symbols(&self) -> Vec<String> {
        self.symbols.clone()
    }

    fn run(
        self: Box<Self>,
        engine: AnalyticsEngine,
        shutdown: watch::Receiver<bool>,
    ) -> BoxFuture<'static, Result<(), FeedError>> {
        (*self).drive(engine, shutdown).boxed()
    }
}
