use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::events::{DomainEvent, EventKind, TopicKey};
use crate::metrics::DispatchMetrics;
use crate::schema::{EncoderId, PacketVersion, SchemaRegistry, WireFormat};
use crate::subscriber::{EnqueueOutcome, Subscriber, SubscriberId, TopicIndex};

/// What happened to one subscriber during one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    DeliveredEvictedOldest,
    DroppedNewest,
    /// Queue overflowed under the disconnect policy; the subscriber was removed
    Disconnected,
    /// No encoder for the subscriber's negotiated version
    UnsupportedVersion(PacketVersion),
    EncodeFailed,
    /// Channel already closed when the dispatch reached it
    SkippedClosed,
    /// Unsubscribed after the snapshot was taken
    SkippedUnsubscribed,
    /// Subscriber handle dropped without a disconnect
    Gone,
}

impl DeliveryOutcome {
    pub fn is_delivered(self) -> bool {
        matches!(
            self,
            DeliveryOutcome::Delivered | DeliveryOutcome::DeliveredEvictedOldest
        )
    }

    pub fn is_dropped(self) -> bool {
        matches!(
            self,
            DeliveryOutcome::DroppedNewest | DeliveryOutcome::Disconnected
        )
    }
}

impl From<EnqueueOutcome> for DeliveryOutcome {
    fn from(outcome: EnqueueOutcome) -> Self {
        match outcome {
            EnqueueOutcome::Delivered => DeliveryOutcome::Delivered,
            EnqueueOutcome::DeliveredEvictedOldest => DeliveryOutcome::DeliveredEvictedOldest,
            EnqueueOutcome::DroppedNewest => DeliveryOutcome::DroppedNewest,
            EnqueueOutcome::Disconnected => DeliveryOutcome::Disconnected,
            EnqueueOutcome::Closed => DeliveryOutcome::SkippedClosed,
        }
    }
}

/// Per-subscriber outcomes of one dispatch
#[derive(Debug, Clone)]
pub struct DispatchReport {
    event_id: Uuid,
    kind: EventKind,
    topic: TopicKey,
    outcomes: Vec<(SubscriberId, DeliveryOutcome)>,
}

impl DispatchReport {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn topic(&self) -> &TopicKey {
        &self.topic
    }

    pub fn outcomes(&self) -> &[(SubscriberId, DeliveryOutcome)] {
        &self.outcomes
    }

    pub fn outcome_for(&self, id: SubscriberId) -> Option<DeliveryOutcome> {
        self.outcomes
            .iter()
            .find(|(subscriber, _)| *subscriber == id)
            .map(|(_, outcome)| *outcome)
    }

    /// Number of subscribers in the snapshot
    pub fn recipients(&self) -> usize {
        self.outcomes.len()
    }

    pub fn delivered(&self) -> usize {
        self.count(|outcome| outcome.is_delivered())
    }

    pub fn dropped(&self) -> usize {
        self.count(|outcome| outcome.is_dropped())
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| !outcome.is_delivered() && !outcome.is_dropped())
    }

    fn count(&self, predicate: impl Fn(DeliveryOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(*outcome))
            .count()
    }
}

/// Encoded frames of the current dispatch, keyed by encoder and format.
/// `None` marks an encoder that already failed for this event.
type FrameCache = HashMap<(EncoderId, WireFormat), Option<Bytes>>;

/// Delivers one event to every subscriber of its topic
///
/// Each subscriber is handled independently: a failure to encode for one
/// version, or a full queue, only affects that subscriber. The dispatcher
/// never blocks on a slow consumer.
#[derive(Clone)]
pub struct FanoutDispatcher {
    registry: Arc<SchemaRegistry>,
    index: TopicIndex,
    metrics: Arc<DispatchMetrics>,
}

impl FanoutDispatcher {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        index: TopicIndex,
        metrics: Arc<DispatchMetrics>,
    ) -> Self {
        Self {
            registry,
            index,
            metrics,
        }
    }

    pub fn index(&self) -> &TopicIndex {
        &self.index
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    pub fn dispatch(&self, event: &DomainEvent) -> DispatchReport {
        let topic = event.topic();
        let targets = self.index.fanout_targets(topic.as_str());
        self.metrics.record_dispatched();

        let mut report = DispatchReport {
            event_id: event.id(),
            kind: event.kind(),
            topic: topic.clone(),
            outcomes: Vec::with_capacity(targets.len()),
        };

        if targets.is_empty() {
            debug!(topic = %topic, kind = %event.kind(), "No subscribers for topic");
            return report;
        }

        let mut frames = FrameCache::new();
        let mut overflowed = Vec::new();
        let mut closed = Vec::new();

        for member in targets.iter() {
            let outcome = match member.upgrade() {
                Some(subscriber) => {
                    let outcome = self.deliver(event, &subscriber, &mut frames);
                    match outcome {
                        DeliveryOutcome::Disconnected => overflowed.push(subscriber),
                        DeliveryOutcome::SkippedClosed => closed.push(subscriber),
                        _ => {}
                    }
                    outcome
                }
                None => DeliveryOutcome::Gone,
            };

            self.metrics.record_outcome(&outcome);
            report.outcomes.push((member.id(), outcome));
        }

        for subscriber in overflowed {
            warn!(
                topic = %topic,
                subscriber = %subscriber.id(),
                "Outbound queue overflowed, disconnecting subscriber"
            );
            self.index.disconnect(&subscriber);
        }
        // Channel closed without going through the index, e.g. receiver dropped
        for subscriber in closed {
            debug!(
                topic = %topic,
                subscriber = %subscriber.id(),
                reason = ?subscriber.close_reason(),
                "Detaching closed subscriber"
            );
            self.index.disconnect(&subscriber);
        }

        if report
            .outcomes
            .iter()
            .any(|(_, outcome)| *outcome == DeliveryOutcome::Gone)
        {
            self.index.prune(topic.as_str());
        }

        debug!(
            topic = %topic,
            kind = %event.kind(),
            event_id = %event.id(),
            recipients = report.recipients(),
            delivered = report.delivered(),
            "Event dispatched"
        );
        report
    }

    fn deliver(
        &self,
        event: &DomainEvent,
        subscriber: &Subscriber,
        frames: &mut FrameCache,
    ) -> DeliveryOutcome {
        if subscriber.is_closed() {
            return DeliveryOutcome::SkippedClosed;
        }
        if !subscriber.is_subscribed(event.topic().as_str()) {
            return DeliveryOutcome::SkippedUnsubscribed;
        }

        let version = subscriber.version();
        let route = match self.registry.resolve(event.kind(), version) {
            Ok(route) => route,
            Err(e) => {
                warn!(
                    subscriber = %subscriber.id(),
                    kind = %event.kind(),
                    version = %version,
                    error = %e,
                    "Skipping subscriber"
                );
                return DeliveryOutcome::UnsupportedVersion(version);
            }
        };

        let format = subscriber.format();
        let frame = frames
            .entry((route.encoder, format))
            .or_insert_with(|| match self.registry.encode_route(&route, event, format) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    error!(
                        kind = %event.kind(),
                        version = %route.version,
                        format = %format,
                        error = %e,
                        "Failed to encode event"
                    );
                    None
                }
            });

        match frame {
            Some(frame) => subscriber.enqueue(frame.clone()).into(),
            None => DeliveryOutcome::EncodeFailed,
        }
    }
}
