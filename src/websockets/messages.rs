use serde::{Deserialize, Serialize};

use super::socket::Frame;
use crate::schema::{EncodeError, WireFormat};

/// Client -> server control frames
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ControlMessage {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    Ping,
}

/// Server -> client answers to control frames
///
/// Uses the same `{"cmd": .., "val": ..}` envelope as event frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "val", rename_all = "snake_case")]
pub enum ControlReply {
    Subscribed { topic: String },
    Unsubscribed { topic: String },
    Pong,
    Error { message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Invalid JSON control frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid MessagePack control frame: {0}")]
    MessagePack(#[from] rmp_serde::decode::Error),
}

impl ControlMessage {
    /// Text frames carry JSON, binary frames carry MessagePack
    pub fn decode(frame: &Frame) -> Result<Self, ControlError> {
        match frame {
            Frame::Text(text) => Ok(serde_json::from_str(text)?),
            Frame::Binary(data) => Ok(rmp_serde::from_slice(data)?),
        }
    }
}

impl ControlReply {
    pub fn error(message: impl Into<String>) -> Self {
        ControlReply::Error {
            message: message.into(),
        }
    }

    pub fn encode(&self, format: WireFormat) -> Result<Frame, EncodeError> {
        match format {
            WireFormat::Json => Ok(Frame::Text(serde_json::to_string(self)?)),
            WireFormat::MessagePack => Ok(Frame::Binary(rmp_serde::to_vec_named(self)?)),
        }
    }
}
