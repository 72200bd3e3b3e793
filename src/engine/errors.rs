use thiserror::Error;

use crate::market::errors::MarketDataError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Rejected event: {0}")]
    Rejected(#[from] MarketDataError),
    #[error("Instrument {symbol} unavailable: {reason}")]
    InstrumentUnavailable { symbol: String, reason: String },
    #[error("Unexpected reply from instrument actor: {0}")]
    UnexpectedReply(String),
}
