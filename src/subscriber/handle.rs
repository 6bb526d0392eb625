use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::channel::{channel, ChannelConfig, ChannelReceiver, ChannelSender, CloseReason, EnqueueOutcome};
use crate::event::TopicKey;
use crate::schema::{PacketVersion, WireFormat};
use crate::sync::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One live connection's view of the event stream
///
/// The transport owns the `Arc<Subscriber>` and the matching
/// [`ChannelReceiver`]; the topic index only keeps weak references.
pub struct Subscriber {
    id: SubscriberId,
    version: PacketVersion,
    format: WireFormat,
    sender: ChannelSender,
    topics: Mutex<HashSet<TopicKey>>,
    connected_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn new(
        version: PacketVersion,
        format: WireFormat,
        config: ChannelConfig,
    ) -> (Arc<Self>, ChannelReceiver) {
        let (sender, receiver) = channel(config);
        let subscriber = Arc::new(Self {
            id: SubscriberId::new(),
            version,
            format,
            sender,
            topics: Mutex::new(HashSet::new()),
            connected_at: Utc::now(),
        });
        (subscriber, receiver)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn version(&self) -> PacketVersion {
        self.version
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Topics this subscriber is currently attached to, sorted
    pub fn topics(&self) -> Vec<TopicKey> {
        let mut topics: Vec<TopicKey> = lock(&self.topics).iter().cloned().collect();
        topics.sort();
        topics
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        lock(&self.topics).contains(topic)
    }

    pub fn enqueue(&self, frame: Bytes) -> EnqueueOutcome {
        self.sender.enqueue(frame)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.sender.close_reason()
    }

    pub fn queued(&self) -> usize {
        self.sender.len()
    }

    // Membership is only changed by the topic index, under its write lock.

    pub(crate) fn add_topic(&self, topic: TopicKey) -> bool {
        lock(&self.topics).insert(topic)
    }

    pub(crate) fn remove_topic(&self, topic: &str) -> bool {
        lock(&self.topics).remove(topic)
    }

    pub(crate) fn take_topics(&self) -> HashSet<TopicKey> {
        std::mem::take(&mut *lock(&self.topics))
    }

    pub(crate) fn close(&self, reason: CloseReason) -> bool {
        self.sender.close(reason)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("format", &self.format)
            .field("closed", &self.is_closed())
            .finish()
    }
}
