// Versioned event distribution engine
// This file exposes the public API for the server binary and integration tests

pub mod config;
pub mod event;
pub mod metrics;
pub mod schema;
pub mod shared;
pub mod subscriber;
pub mod websockets;

mod sync;

// Re-export commonly used types for easier access in tests
pub use config::{ConfigError, EngineConfig};
pub use event::{DomainEvent, EventBus, EventKind, FanoutDispatcher, SubmitError, TopicKey};
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use schema::{default_registry, PacketVersion, SchemaRegistry, WireFormat};
pub use shared::{AppError, AppState};
pub use subscriber::{ChannelConfig, OverflowPolicy, Subscriber, TopicIndex};
