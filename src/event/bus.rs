use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::dispatcher::{DispatchReport, FanoutDispatcher};
use super::error::SubmitError;
use super::events::{DomainEvent, TopicKey};
use crate::metrics::DispatchMetrics;
use crate::subscriber::TopicIndex;
use crate::sync::lock;

/// What a producer gets back for an accepted event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitReceipt {
    pub event_id: Uuid,
    pub topic: TopicKey,
    /// Position of the event within its topic, starting at 1
    pub sequence: u64,
    pub recipients: usize,
    pub delivered: usize,
    pub skipped: usize,
    pub dropped: usize,
}

impl SubmitReceipt {
    fn new(sequence: u64, report: &DispatchReport) -> Self {
        Self {
            event_id: report.event_id(),
            topic: report.topic().clone(),
            sequence,
            recipients: report.recipients(),
            delivered: report.delivered(),
            skipped: report.skipped(),
            dropped: report.dropped(),
        }
    }
}

/// Per-topic sequencing state
///
/// Tokio's mutex hands out the lock in FIFO order, so submitters on one topic
/// dispatch in the order they arrived at the lane.
struct Lane {
    next_sequence: tokio::sync::Mutex<u64>,
}

impl Lane {
    fn new() -> Self {
        Self {
            next_sequence: tokio::sync::Mutex::new(1),
        }
    }
}

struct BusInner {
    dispatcher: FanoutDispatcher,
    lanes: Mutex<HashMap<TopicKey, Arc<Lane>>>,
}

/// Single entry point for producers
///
/// Events on the same topic are dispatched one at a time in submission order;
/// events on different topics never wait on each other.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new(dispatcher: FanoutDispatcher) -> Self {
        Self {
            inner: Arc::new(BusInner {
                dispatcher,
                lanes: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Validates, sequences and dispatches one event
    #[instrument(
        skip(self, event),
        fields(topic = %event.topic(), kind = %event.kind(), event_id = %event.id())
    )]
    pub async fn submit(&self, event: DomainEvent) -> Result<SubmitReceipt, SubmitError> {
        if let Err(e) = event.validate() {
            self.metrics().record_rejected();
            warn!(error = %e, "Rejected event");
            return Err(e);
        }
        self.metrics().record_submitted();

        let lane = self.lane(event.topic());
        let receipt = {
            let mut next_sequence = lane.next_sequence.lock().await;
            let sequence = *next_sequence;
            *next_sequence += 1;

            let report = self.inner.dispatcher.dispatch(&event);
            SubmitReceipt::new(sequence, &report)
        };
        drop(lane);

        self.release_idle_lane(event.topic());

        debug!(
            sequence = receipt.sequence,
            delivered = receipt.delivered,
            "Event submitted"
        );
        Ok(receipt)
    }

    /// Releases every lane nobody is using on a topic without subscribers
    pub fn release_idle_lanes(&self) -> usize {
        let index = self.inner.dispatcher.index();
        let mut lanes = lock(&self.inner.lanes);
        let before = lanes.len();
        lanes.retain(|topic, lane| {
            Arc::strong_count(lane) > 1 || index.subscriber_count(topic.as_str()) > 0
        });
        before - lanes.len()
    }

    pub fn lane_count(&self) -> usize {
        lock(&self.inner.lanes).len()
    }

    pub fn topic_index(&self) -> &TopicIndex {
        self.inner.dispatcher.index()
    }

    pub fn dispatcher(&self) -> &FanoutDispatcher {
        &self.inner.dispatcher
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        self.inner.dispatcher.metrics()
    }

    fn lane(&self, topic: &TopicKey) -> Arc<Lane> {
        let mut lanes = lock(&self.inner.lanes);
        Arc::clone(
            lanes
                .entry(topic.clone())
                .or_insert_with(|| Arc::new(Lane::new())),
        )
    }

    // The map lock is what every other submitter goes through to reach a
    // lane, so a strong count of one here means nobody is queued on it.
    fn release_idle_lane(&self, topic: &TopicKey) {
        let mut lanes = lock(&self.inner.lanes);
        let idle = lanes
            .get(topic)
            .is_some_and(|lane| Arc::strong_count(lane) == 1);

        if idle && self.topic_index().subscriber_count(topic.as_str()) == 0 {
            lanes.remove(topic);
            debug!(topic = %topic, "Released idle lane");
        }
    }
}
