use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use thiserror::Error;
use tracing::{debug, info};

use super::channel::CloseReason;
use super::handle::{Subscriber, SubscriberId};
use crate::event::TopicKey;
use crate::sync::{read, write};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("Subscriber {0} is closed")]
    SubscriberClosed(SubscriberId),
}

/// Weak reference to a subscriber attached to a topic
#[derive(Debug, Clone)]
pub struct TopicMember {
    id: SubscriberId,
    handle: Weak<Subscriber>,
}

impl TopicMember {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Returns the subscriber if its owner still holds it
    pub fn upgrade(&self) -> Option<Arc<Subscriber>> {
        self.handle.upgrade()
    }

    fn is_dead(&self) -> bool {
        self.handle.strong_count() == 0
    }
}

/// Immutable view of a topic's members at one point in time
///
/// Writers replace the topic's member slice instead of mutating it, so a
/// snapshot held by an in-flight dispatch never changes underneath it.
#[derive(Debug, Clone)]
pub struct TopicSnapshot {
    members: Arc<[TopicMember]>,
}

impl Default for TopicSnapshot {
    fn default() -> Self {
        Self {
            members: Arc::from(Vec::new()),
        }
    }
}

impl TopicSnapshot {
    pub fn iter(&self) -> impl Iterator<Item = &TopicMember> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.members.iter().any(|member| member.id == id)
    }
}

/// Topic → subscribers index
///
/// Cheap to clone; clones share the same state. Instances are independent of
/// each other, there is no process-wide index.
#[derive(Debug, Clone, Default)]
pub struct TopicIndex {
    topics: Arc<RwLock<HashMap<TopicKey, TopicSnapshot>>>,
}

impl TopicIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `subscriber` to `topic`. Returns false if it already was.
    pub fn subscribe(
        &self,
        topic: &TopicKey,
        subscriber: &Arc<Subscriber>,
    ) -> Result<bool, IndexError> {
        let mut topics = write(&self.topics);

        // Checked under the write lock so a concurrent disconnect either
        // happens entirely before or entirely after
        if subscriber.is_closed() {
            return Err(IndexError::SubscriberClosed(subscriber.id()));
        }

        let snapshot = topics.entry(topic.clone()).or_default();
        if snapshot.contains(subscriber.id()) {
            return Ok(false);
        }

        let member = TopicMember {
            id: subscriber.id(),
            handle: Arc::downgrade(subscriber),
        };
        snapshot.members = snapshot
            .members
            .iter()
            .cloned()
            .chain(std::iter::once(member))
            .collect();
        subscriber.add_topic(topic.clone());

        debug!(
            topic = %topic,
            subscriber = %subscriber.id(),
            members = snapshot.len(),
            "Subscribed to topic"
        );
        Ok(true)
    }

    /// Detaches `subscriber` from `topic`. Returns false if it was not attached.
    pub fn unsubscribe(&self, topic: &str, subscriber: &Subscriber) -> bool {
        let mut topics = write(&self.topics);
        let removed = Self::remove_member(&mut topics, topic, subscriber.id());
        subscriber.remove_topic(topic);

        if removed {
            debug!(topic = %topic, subscriber = %subscriber.id(), "Unsubscribed from topic");
        }
        removed
    }

    /// Closes the subscriber's channel and detaches it from every topic in one
    /// step. Returns the number of topics it was removed from.
    pub fn disconnect(&self, subscriber: &Subscriber) -> usize {
        let mut topics = write(&self.topics);

        subscriber.close(CloseReason::Disconnected);
        let mut removed = 0;
        for topic in subscriber.take_topics() {
            if Self::remove_member(&mut topics, topic.as_str(), subscriber.id()) {
                removed += 1;
            }
        }

        info!(
            subscriber = %subscriber.id(),
            topics = removed,
            reason = ?subscriber.close_reason(),
            "Subscriber disconnected"
        );
        removed
    }

    /// Snapshot of the members of `topic`; empty if nobody is subscribed
    pub fn fanout_targets(&self, topic: &str) -> TopicSnapshot {
        read(&self.topics).get(topic).cloned().unwrap_or_default()
    }

    /// Drops members whose subscriber has been dropped without disconnecting
    pub fn prune(&self, topic: &str) -> usize {
        let mut topics = write(&self.topics);
        let Some(snapshot) = topics.get_mut(topic) else {
            return 0;
        };

        let before = snapshot.len();
        if snapshot.iter().any(TopicMember::is_dead) {
            snapshot.members = snapshot
                .iter()
                .filter(|member| !member.is_dead())
                .cloned()
                .collect();
        }
        let pruned = before - snapshot.len();

        if snapshot.is_empty() {
            topics.remove(topic);
        }
        if pruned > 0 {
            debug!(topic = %topic, pruned, "Pruned dropped subscribers");
        }
        pruned
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        read(&self.topics).get(topic).map_or(0, TopicSnapshot::len)
    }

    pub fn topic_count(&self) -> usize {
        read(&self.topics).len()
    }

    pub fn topics(&self) -> Vec<TopicKey> {
        let mut topics: Vec<TopicKey> = read(&self.topics).keys().cloned().collect();
        topics.sort();
        topics
    }

    fn remove_member(
        topics: &mut HashMap<TopicKey, TopicSnapshot>,
        topic: &str,
        id: SubscriberId,
    ) -> bool {
        let Some(snapshot) = topics.get_mut(topic) else {
            return false;
        };
        if !snapshot.contains(id) {
            return false;
        }

        snapshot.members = snapshot
            .iter()
            .filter(|member| member.id != id)
            .cloned()
            .collect();

        // Empty topics are dropped so idle keys cost nothing
        if snapshot.is_empty() {
            topics.remove(topic);
        }
        true
    }
}
