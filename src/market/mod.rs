//! Market event model
//!
//! Fixed-shape candle and trade records validated at the ingestion boundary,
//! plus the bounded FIFO buffers that hold them per instrument.
pub mod buffer;
pub mod errors;
pub mod structs;

pub use buffer::EventBuffer;
pub use errors::MarketDataError;
pub use structs::{AggregatedCandle, Candle, TimestampMS, Trade, TradeSide};
