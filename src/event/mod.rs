// Event model and the path an event takes from producer to subscriber queues
//
// Producers hand a `DomainEvent` to the `EventBus`, which sequences it per
// topic and lets the `FanoutDispatcher` encode and enqueue it.

// Public API - what other modules can use
pub use bus::{EventBus, SubmitReceipt};
pub use sweeper::start_lane_sweeper;
pub use dispatcher::{DeliveryOutcome, DispatchReport, FanoutDispatcher};
pub use error::{Malformed, SubmitError};
pub use events::{
    ChatDeletedPayload, ChatPayload, ChatUpdatedPayload, DomainEvent, EventKind, EventPayload,
    Permissions, PostDeletedPayload, PostPayload, ReactionPayload, TopicKey, TypingPayload, User,
};

// Internal modules
mod bus;
mod dispatcher;
mod error;
mod events;
mod sweeper;
