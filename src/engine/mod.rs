//! Per-instrument actors and the engine facade that routes events to them
pub mod actor;
pub mod errors;
pub mod handle;
pub mod structs;

pub use actor::{InstrumentActor, InstrumentAsk, InstrumentReply};
pub use errors::EngineError;
pub use handle::AnalyticsEngine;
pub use structs::{EngineConfig, InstrumentStatistics, RecomputeOutcome};
