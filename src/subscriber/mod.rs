// Live subscribers and the topic index that routes to them

// Public API - what other modules can use
pub use channel::{
    channel, ChannelConfig, ChannelReceiver, ChannelSender, CloseReason, EnqueueOutcome,
    OverflowPolicy,
};
pub use handle::{Subscriber, SubscriberId};
pub use index::{IndexError, TopicIndex, TopicMember, TopicSnapshot};

// Internal modules
mod channel;
mod handle;
mod index;
