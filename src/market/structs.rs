use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::MarketDataError;

pub type TimestampMS = i64;

/// Relative tolerance when checking that buy volume fits inside total volume
const VOLUME_TOLERANCE: f64 = 1e-9;

/// Closed 1-minute candle for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub timestamp: TimestampMS,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub buy_volume: f64,
    pub sell_volume: f64,
}

/// Higher timeframe candles share the 1-minute shape
pub type AggregatedCandle = Candle;

impl Candle {
    /// Build a candle, deriving sell volume from total and buy volume
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        timestamp: TimestampMS,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        buy_volume: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            buy_volume,
            sell_volume: volume - buy_volume,
        }
    }

    /// Intrabar price range
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Check the candle is well formed before it reaches any buffer
    pub fn validate(&self) -> Result<(), MarketDataError> {
        validate_symbol(&self.symbol)?;

        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
            ("buy_volume", self.buy_volume),
            ("sell_volume", self.sell_volume),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(MarketDataError::NonFinite { field, value });
            }
        }

        if self.low <= 0.0 {
            return Err(MarketDataError::InvalidCandle(format!(
                "non-positive low price {}", self.low
            )));
        }
        if self.high < self.low {
            return Err(MarketDataError::InvalidCandle(format!(
                "high {} below low {}", self.high, self.low
            )));
        }
        if self.open > self.high || self.open < self.low || self.close > self.high || self.close < self.low {
            return Err(MarketDataError::InvalidCandle(format!(
                "open {} / close {} outside [{}, {}]", self.open, self.close, self.low, self.high
            )));
        }
        if self.volume < 0.0 || self.buy_volume < 0.0 {
            return Err(MarketDataError::InvalidCandle(format!(
                "negative volume (total {}, buy {})", self.volume, self.buy_volume
            )));
        }
        if self.buy_volume > self.volume * (1.0 + VOLUME_TOLERANCE) {
            return Err(MarketDataError::InvalidCandle(format!(
                "buy volume {} exceeds total volume {}", self.buy_volume, self.volume
            )));
        }
        let expected_sell = self.volume - self.buy_volume;
        if (self.sell_volume - expected_sell).abs() > self.volume.max(1.0) * VOLUME_TOLERANCE {
            return Err(MarketDataError::InvalidCandle(format!(
                "sell volume {} does not match total minus buy {}", self.sell_volume, expected_sell
            )));
        }

        Ok(())
    }
}

/// Aggressor side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// Single executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub timestamp: TimestampMS,
    pub price: f64,
    pub quantity: f64,
    pub side: TradeSide,
    /// Set by the order-flow calculator on its output, never at ingest
    pub is_big_print: bool,
}

impl Trade {
    pub fn new(symbol: impl Into<String>, timestamp: TimestampMS, price: f64, quantity: f64, side: TradeSide) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            price,
            quantity,
            side,
            is_big_print: false,
        }
    }

    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    pub fn signed_quantity(&self) -> f64 {
        match self.side {
            TradeSide::Buy => self.quantity,
            TradeSide::Sell => -self.quantity,
        }
    }

    pub fn validate(&self) -> Result<(), MarketDataError> {
        validate_symbol(&self.symbol)?;

        for (field, value) in [("price", self.price), ("quantity", self.quantity)] {
            if !value.is_finite() {
                return Err(MarketDataError::NonFinite { field, value });
            }
        }
        if self.price <= 0.0 {
            return Err(MarketDataError::InvalidTrade(format!("non-positive price {}", self.price)));
        }
        if self.quantity <= 0.0 {
            return Err(MarketDataError::InvalidTrade(format!("non-positive quantity {}", self.quantity)));
        }

        Ok(())
    }
}

/// Symbols are upper-case alphanumeric exchange tickers (e.g. BTCUSDT)
pub fn validate_symbol(symbol: &str) -> Result<(), MarketDataError> {
    if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err(MarketDataError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

/// Upper-case and validate a list of configured symbols
pub fn normalize_symbols(symbols: &[String]) -> Result<Vec<String>, MarketDataError> {
    symbols
        .iter()
        .map(|s| {
            let upper = s.trim().to_uppercase();
            validate_symbol(&upper).map(|_| upper)
        })
        .collect()
}
