use thiserror::Error;

use crate::market::errors::MarketDataError;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Connection closed: {0}")]
    Closed(String),

    #[error("Feed configuration error: {0}")]
    Config(String),

    #[error("Feed already running ({0})")]
    AlreadyRunning(String),

    #[error("Feed task failed: {0}")]
    Task(String),
}
