use bytes::Bytes;
use serde::Serialize;

use super::error::EncodeError;
use super::version::WireFormat;
use crate::event::{DomainEvent, EventKind};

/// Turns a domain event into the bytes of one packet version
pub trait PacketEncoder: Send + Sync {
    fn encode(&self, event: &DomainEvent, format: WireFormat) -> Result<Bytes, EncodeError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

pub type EncodeFn = fn(&DomainEvent, WireFormat) -> Result<Bytes, EncodeError>;

/// Encoder backed by a plain function
pub struct FnEncoder {
    name: &'static str,
    encode: EncodeFn,
}

impl FnEncoder {
    pub fn new(name: &'static str, encode: EncodeFn) -> Self {
        Self { name, encode }
    }
}

impl PacketEncoder for FnEncoder {
    fn encode(&self, event: &DomainEvent, format: WireFormat) -> Result<Bytes, EncodeError> {
        (self.encode)(event, format)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Envelope every packet travels in
#[derive(Serialize)]
struct Frame<'a, P> {
    cmd: &'static str,
    val: &'a P,
}

/// Wraps a packet in its envelope and serializes it in the requested format
pub fn write_frame<P: Serialize>(
    kind: EventKind,
    packet: &P,
    format: WireFormat,
) -> Result<Bytes, EncodeError> {
    let frame = Frame {
        cmd: kind.name(),
        val: packet,
    };

    let bytes = match format {
        WireFormat::Json => serde_json::to_vec(&frame)?,
        WireFormat::MessagePack => rmp_serde::to_vec_named(&frame)?,
    };

    Ok(Bytes::from(bytes))
}
