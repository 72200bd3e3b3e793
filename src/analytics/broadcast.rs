use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::common::constants::DEFAULT_SUBSCRIBER_QUEUE;
use crate::market::structs::TimestampMS;
use crate::order_flow::structs::OrderFlowMetrics;
use crate::volume_profile::structs::{VolumeProfile, VolumeProfileLevel};
use super::signal::TradingSignal;

pub type SubscriberId = u64;

/// Condensed profile carried in market updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
    /// Leading levels in ascending price order
    pub levels: Vec<VolumeProfileLevel>,
}

impl ProfileSummary {
    pub fn from_profile(profile: &VolumeProfile, max_levels: usize) -> Self {
        Self {
            poc: profile.poc,
            vah: profile.vah,
            val: profile.val,
            levels: profile.top_levels(max_levels),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdate {
    pub symbol: String,
    /// When the update was computed, not the candle time
    pub timestamp: TimestampMS,
    pub latest_price: f64,
    pub volume_profile: ProfileSummary,
    pub order_flow: OrderFlowMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalUpdate {
    pub symbol: String,
    pub signal: TradingSignal,
}

/// Payload pushed to every subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BroadcastEvent {
    MarketUpdate(MarketUpdate),
    NewSignal(SignalUpdate),
}

impl BroadcastEvent {
    pub fn symbol(&self) -> &str {
        match self {
            BroadcastEvent::MarketUpdate(update) => &update.symbol,
            BroadcastEvent::NewSignal(update) => &update.symbol,
        }
    }
}

/// Receiving end of one subscriber's bounded queue.
///
/// When the subscriber falls more than the queue capacity behind, the oldest
/// events are overwritten and skipped on the next receive.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: broadcast::Receiver<BroadcastEvent>,
    skipped: u64,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Events lost to queue overflow so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Next event, or `None` once unsubscribed
    pub async fn recv(&mut self) -> Option<BroadcastEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => self.record_lag(missed),
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next event if one is queued
    pub fn try_recv(&mut self) -> Option<BroadcastEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => self.record_lag(missed),
                Err(_) => return None,
            }
        }
    }

    fn record_lag(&mut self, missed: u64) {
        self.skipped += missed;
        warn!("Subscriber {} lagging, skipped {} events", self.id, missed);
    }
}

type SubscriberList = Arc<Vec<(SubscriberId, broadcast::Sender<BroadcastEvent>)>>;

#[derive(Debug)]
struct BroadcasterInner {
    subscribers: RwLock<SubscriberList>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

/// Fan-out of analytics events to a dynamic set of subscribers.
///
/// The subscriber list is copy-on-write: publish works on an immutable snapshot,
/// so subscribe and unsubscribe never race a delivery in progress.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    inner: Arc<BroadcasterInner>,
}

impl Broadcaster {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(BroadcasterInner {
                subscribers: RwLock::new(Arc::new(Vec::new())),
                next_id: AtomicU64::new(1),
                queue_capacity: queue_capacity.max(1),
            }),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = broadcast::channel(self.inner.queue_capacity);

        let mut guard = self.inner.subscribers.write();
        let mut list = Vec::clone(&**guard);
        list.push((id, sender));
        *guard = Arc::new(list);
        drop(guard);

        info!("📡 Subscriber {} connected", id);
        Subscription { id, receiver, skipped: 0 }
    }

    /// Returns whether `id` was subscribed
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.remove(&[id]);
        if removed {
            info!("📴 Subscriber {} disconnected", id);
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Deliver `event` to every current subscriber; returns the delivery count.
    ///
    /// A subscriber whose receiving end is gone is logged and removed.
    pub fn publish(&self, event: BroadcastEvent) -> usize {
        let snapshot = Arc::clone(&*self.inner.subscribers.read());
        let mut delivered = 0;
        let mut gone = Vec::new();

        for (id, sender) in snapshot.iter() {
            match sender.send(event.clone()) {
                Ok(_) => delivered += 1,
                Err(_) => {
                    warn!("Delivery to subscriber {} failed, removing it", id);
                    gone.push(*id);
                }
            }
        }

        if !gone.is_empty() {
            self.remove(&gone);
        }

        debug!("Published {} update to {} subscribers", event.symbol(), delivered);
        delivered
    }

    fn remove(&self, ids: &[SubscriberId]) -> bool {
        let mut guard = self.inner.subscribers.write();
        if !guard.iter().any(|(id, _)| ids.contains(id)) {
            return false;
        }
        let list: Vec<_> = guard.iter().filter(|(id, _)| !ids.contains(id)).cloned().collect();
        *guard = Arc::new(list);
        true
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_QUEUE)
    }
}
