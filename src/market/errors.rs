use thiserror::Error;

/// Rejections raised at the ingestion boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("Invalid symbol: '{0}'")]
    InvalidSymbol(String),
    #[error("Non-finite {field}: {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("Invalid candle: {0}")]
    InvalidCandle(String),
    #[error("Invalid trade: {0}")]
    InvalidTrade(String),
    #[error("Out of order candle: {timestamp} does not advance past {last}")]
    OutOfOrder { timestamp: i64, last: i64 },
    #[error("Symbol mismatch: event for {event} routed to {instrument}")]
    SymbolMismatch { instrument: String, event: String },
    #[error("Parse error: {0}")]
    Parse(String),
}
