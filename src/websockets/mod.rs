// Demo WebSocket/HTTP transport over the event engine

// Public API
pub use handler::{
    metrics, router, submit_event, topics, websocket_handler, ConnectParams, SubmitEventRequest,
    TopicSummary,
};
pub use messages::{ControlError, ControlMessage, ControlReply};
pub use socket::{Connection, Frame, SocketError, SocketWrapper};

// Internal modules
mod handler;
mod messages;
mod socket;
