#![allow(dead_code)]

use std::sync::Arc;
use tokio::task::JoinHandle;

use eventcast::{
    event::{DomainEvent, EventBus, FanoutDispatcher, TopicKey},
    schema::{default_registry, PacketVersion, WireFormat},
    subscriber::{ChannelConfig, ChannelReceiver, OverflowPolicy, Subscriber, TopicIndex},
    websockets::{Connection, SocketError},
    DispatchMetrics,
};

use super::mocks::{mock_socket, MockClient};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub bus: EventBus,
    pub index: TopicIndex,
    pub channel: ChannelConfig,
}

pub struct TestSetupBuilder {
    channel: ChannelConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            channel: ChannelConfig::default(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.channel = ChannelConfig::new(capacity, self.channel.overflow_policy);
        self
    }

    pub fn with_policy(mut self, policy: OverflowPolicy) -> Self {
        self.channel = ChannelConfig::new(self.channel.capacity, policy);
        self
    }

    pub fn build(self) -> TestSetup {
        let index = TopicIndex::new();
        let dispatcher = FanoutDispatcher::new(
            Arc::new(default_registry().unwrap()),
            index.clone(),
            Arc::new(DispatchMetrics::new()),
        );

        TestSetup {
            bus: EventBus::new(dispatcher),
            index,
            channel: self.channel,
        }
    }
}

/// A connection running against a mock socket
pub struct ConnectedClient {
    pub subscriber: Arc<Subscriber>,
    pub client: MockClient,
    pub task: JoinHandle<Result<(), SocketError>>,
}

impl TestSetup {
    pub fn subscriber(&self, version: PacketVersion) -> (Arc<Subscriber>, ChannelReceiver) {
        Subscriber::new(version, WireFormat::Json, self.channel)
    }

    /// New JSON subscriber already attached to `topic`
    pub fn join(&self, topic: &str, version: PacketVersion) -> (Arc<Subscriber>, ChannelReceiver) {
        let (subscriber, receiver) = self.subscriber(version);
        self.index
            .subscribe(&TopicKey::new(topic), &subscriber)
            .unwrap();
        (subscriber, receiver)
    }

    /// Runs a `Connection` over an in-memory socket
    pub fn connect(&self, version: PacketVersion, format: WireFormat) -> ConnectedClient {
        let (subscriber, outbound) = Subscriber::new(version, format, self.channel);
        let (socket, client) = mock_socket();
        let connection = Connection::new(
            Arc::clone(&subscriber),
            Box::new(socket),
            outbound,
            self.index.clone(),
        );

        ConnectedClient {
            subscriber,
            client,
            task: tokio::spawn(connection.run()),
        }
    }

    pub fn reaction(&self, topic: &str, post_id: &str) -> DomainEvent {
        DomainEvent::post_reaction_add(topic, post_id, "👍", None, "alice")
    }
}
