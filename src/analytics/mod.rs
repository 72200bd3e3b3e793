//! Derived analytics shared with the outside world: the latest-value store, the
//! subscriber broadcaster and the signal advisory hand-off.
pub mod broadcast;
pub mod signal;
pub mod store;

pub use broadcast::{BroadcastEvent, Broadcaster, MarketUpdate, ProfileSummary, SignalUpdate, SubscriberId, Subscription};
pub use signal::{AdvisoryRequest, AdvisoryTap, MarketState, SignalDirection, SignalModel, TradingSignal};
pub use store::{AnalyticsStore, InstrumentAnalytics};
