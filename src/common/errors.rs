use thiserror::Error;

/// Reason a derived artifact could not be produced from the current window.
///
/// Not a failure: the engine keeps the previously stored artifact and carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Unavailable {
    #[error("Insufficient candles: got {got}, need {need}")]
    InsufficientCandles { got: usize, need: usize },
    #[error("Insufficient trades: got {got}, need {need}")]
    InsufficientTrades { got: usize, need: usize },
    #[error("Degenerate price range: all candles at one price with no volume")]
    DegenerateRange,
    #[error("No volume in window")]
    NoVolume,
}
