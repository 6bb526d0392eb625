use bytes::Bytes;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use strum_macros::{Display, EnumString};
use tokio::sync::Notify;

use crate::sync::lock;

/// What happens when a subscriber's outbound queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued frame to make room
    DropOldest,
    /// Discard the frame being enqueued
    DropNewest,
    /// Close the channel; the stream never silently skips a frame
    #[default]
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub capacity: usize,
    pub overflow_policy: OverflowPolicy,
}

impl ChannelConfig {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize, overflow_policy: OverflowPolicy) -> Self {
        Self {
            capacity: capacity.max(1),
            overflow_policy,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, OverflowPolicy::default())
    }
}

/// Result of a single enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Delivered,
    /// Delivered after evicting the oldest queued frame
    DeliveredEvictedOldest,
    /// Queue full, frame discarded
    DroppedNewest,
    /// Queue full, channel closed under the disconnect policy
    Disconnected,
    /// Channel was already closed
    Closed,
}

impl EnqueueOutcome {
    pub fn is_delivered(self) -> bool {
        matches!(
            self,
            EnqueueOutcome::Delivered | EnqueueOutcome::DeliveredEvictedOldest
        )
    }
}

/// Why a channel stopped accepting frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CloseReason {
    /// Queue overflowed under the disconnect policy
    Overflow,
    /// Subscriber disconnected through the topic index
    Disconnected,
    /// The receiving half went away
    ReceiverDropped,
}

struct QueueState {
    frames: VecDeque<Bytes>,
    closed: Option<CloseReason>,
}

struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
    config: ChannelConfig,
}

/// Creates a bounded outbound queue
pub fn channel(config: ChannelConfig) -> (ChannelSender, ChannelReceiver) {
    let shared = Arc::new(Shared {
        state: Mutex::new(QueueState {
            frames: VecDeque::with_capacity(config.capacity.min(1024)),
            closed: None,
        }),
        notify: Notify::new(),
        config,
    });

    (
        ChannelSender {
            shared: Arc::clone(&shared),
        },
        ChannelReceiver { shared },
    )
}

/// Producing half, held by the subscriber. Enqueue never waits on the consumer.
pub struct ChannelSender {
    shared: Arc<Shared>,
}

impl ChannelSender {
    pub fn enqueue(&self, frame: Bytes) -> EnqueueOutcome {
        let outcome = {
            let mut state = lock(&self.shared.state);

            if state.closed.is_some() {
                return EnqueueOutcome::Closed;
            }

            if state.frames.len() < self.shared.config.capacity {
                state.frames.push_back(frame);
                EnqueueOutcome::Delivered
            } else {
                match self.shared.config.overflow_policy {
                    OverflowPolicy::DropOldest => {
                        state.frames.pop_front();
                        state.frames.push_back(frame);
                        EnqueueOutcome::DeliveredEvictedOldest
                    }
                    OverflowPolicy::DropNewest => EnqueueOutcome::DroppedNewest,
                    OverflowPolicy::Disconnect => {
                        // Queued frames go away with the connection
                        state.frames.clear();
                        state.closed = Some(CloseReason::Overflow);
                        EnqueueOutcome::Disconnected
                    }
                }
            }
        };

        if outcome != EnqueueOutcome::DroppedNewest {
            self.shared.notify.notify_one();
        }
        outcome
    }

    /// Closes the channel. Returns false if it was already closed, in which
    /// case the original reason is kept.
    pub fn close(&self, reason: CloseReason) -> bool {
        let closed = {
            let mut state = lock(&self.shared.state);
            if state.closed.is_some() {
                false
            } else {
                state.closed = Some(reason);
                true
            }
        };

        if closed {
            self.shared.notify.notify_one();
        }
        closed
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.shared.state).closed.is_some()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        lock(&self.shared.state).closed
    }

    pub fn len(&self) -> usize {
        lock(&self.shared.state).frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> ChannelConfig {
        self.shared.config
    }
}

/// Consuming half, owned by the transport task
pub struct ChannelReceiver {
    shared: Arc<Shared>,
}

impl ChannelReceiver {
    /// Waits for the next frame
    ///
    /// Frames still queued when the channel is closed are drained first,
    /// then `None` is returned. Cancel safe.
    pub async fn recv(&mut self) -> Option<Bytes> {
        loop {
            if let Some(frame) = self.try_recv() {
                return Some(frame);
            }
            if self.close_reason().is_some() {
                return None;
            }
            self.shared.notify.notified().await;
        }
    }

    pub fn try_recv(&mut self) -> Option<Bytes> {
        lock(&self.shared.state).frames.pop_front()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        lock(&self.shared.state).closed
    }
}

impl Drop for ChannelReceiver {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        state.frames.clear();
        if state.closed.is_none() {
            state.closed = Some(CloseReason::ReceiverDropped);
        }
    }
}
