use thiserror::Error;

use super::version::PacketVersion;
use crate::event::EventKind;

/// Errors raised while turning an event into wire bytes
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("No {kind} encoder registered for {version}")]
    UnsupportedVersion {
        kind: EventKind,
        version: PacketVersion,
    },

    #[error("Route for {kind} {version} points at an encoder this registry does not have")]
    UnknownEncoder {
        kind: EventKind,
        version: PacketVersion,
    },

    #[error("Encoder {encoder} cannot encode a {found} payload")]
    PayloadMismatch {
        encoder: &'static str,
        found: EventKind,
    },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack encoding failed: {0}")]
    MessagePack(#[from] rmp_serde::encode::Error),
}

impl EncodeError {
    pub fn is_unsupported_version(&self) -> bool {
        matches!(self, EncodeError::UnsupportedVersion { .. })
    }
}

/// Errors raised while building a schema registry
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{kind} already has an encoder for {version}")]
    DuplicateVersion {
        kind: EventKind,
        version: PacketVersion,
    },

    #[error("Cannot alias {kind} {version} to unregistered {canonical}")]
    UnknownCanonical {
        kind: EventKind,
        version: PacketVersion,
        canonical: PacketVersion,
    },

    #[error("{0} has no registered versions")]
    MissingKind(EventKind),
}
