use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::DeliveryOutcome;

/// Counters for everything the engine does not report back to producers
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    events_submitted: AtomicU64,
    events_rejected: AtomicU64,
    events_dispatched: AtomicU64,
    deliveries: AtomicU64,
    evictions: AtomicU64,
    drops: AtomicU64,
    overflow_disconnects: AtomicU64,
    unsupported_versions: AtomicU64,
    encode_failures: AtomicU64,
    stale_skips: AtomicU64,
}

/// Point-in-time copy of [`DispatchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub events_submitted: u64,
    pub events_rejected: u64,
    pub events_dispatched: u64,
    pub deliveries: u64,
    pub evictions: u64,
    pub drops: u64,
    pub overflow_disconnects: u64,
    pub unsupported_versions: u64,
    pub encode_failures: u64,
    pub stale_skips: u64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.events_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatched(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outcome(&self, outcome: &DeliveryOutcome) {
        let counter = match outcome {
            DeliveryOutcome::Delivered => &self.deliveries,
            DeliveryOutcome::DeliveredEvictedOldest => {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                &self.deliveries
            }
            DeliveryOutcome::DroppedNewest => &self.drops,
            DeliveryOutcome::Disconnected => &self.overflow_disconnects,
            DeliveryOutcome::UnsupportedVersion(_) => &self.unsupported_versions,
            DeliveryOutcome::EncodeFailed => &self.encode_failures,
            DeliveryOutcome::SkippedClosed
            | DeliveryOutcome::SkippedUnsubscribed
            | DeliveryOutcome::Gone => &self.stale_skips,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        MetricsSnapshot {
            events_submitted: load(&self.events_submitted),
            events_rejected: load(&self.events_rejected),
            events_dispatched: load(&self.events_dispatched),
            deliveries: load(&self.deliveries),
            evictions: load(&self.evictions),
            drops: load(&self.drops),
            overflow_disconnects: load(&self.overflow_disconnects),
            unsupported_versions: load(&self.unsupported_versions),
            encode_failures: load(&self.encode_failures),
            stale_skips: load(&self.stale_skips),
        }
    }
}
