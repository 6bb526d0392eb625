//! Test assertion helpers - fluent API for verifying received frames
#![allow(dead_code)] // Test utilities may not all be used in every test

use serde_json::Value;

use eventcast::websockets::Frame;

// ============================================================================
// Assertion Helpers
// ============================================================================

/// A decoded `{"cmd": .., "val": ..}` envelope
pub struct FrameAssertion {
    value: Value,
}

impl FrameAssertion {
    pub fn from_json(bytes: &[u8]) -> Self {
        Self {
            value: serde_json::from_slice(bytes).expect("frame should be JSON"),
        }
    }

    pub fn from_msgpack(bytes: &[u8]) -> Self {
        Self {
            value: rmp_serde::from_slice(bytes).expect("frame should be MessagePack"),
        }
    }

    pub fn from_frame(frame: &Frame) -> Self {
        match frame {
            Frame::Text(text) => Self::from_json(text.as_bytes()),
            Frame::Binary(data) => Self::from_msgpack(data),
        }
    }

    pub fn cmd(&self, expected: &str) -> &Self {
        assert_eq!(self.value["cmd"], expected, "unexpected cmd in {}", self.value);
        self
    }

    pub fn field(&self, key: &str, expected: impl Into<Value>) -> &Self {
        assert_eq!(
            self.value["val"][key],
            expected.into(),
            "unexpected {key} in {}",
            self.value
        );
        self
    }

    pub fn val(&self) -> &Value {
        &self.value["val"]
    }
}
