// Versioned wire schemas
//
// Every event kind maps to one or more packet versions. Versions either own an
// encoder or alias another version's encoder.

pub use encoder::{write_frame, EncodeFn, FnEncoder, PacketEncoder};
pub use error::{EncodeError, RegistryError};
pub use registry::{EncoderId, Route, SchemaRegistry, SchemaRegistryBuilder};
pub use version::{PacketVersion, VersionPolicy, WireFormat};

mod encoder;
mod error;
pub mod packets;
mod registry;
mod version;

use crate::event::EventKind;

/// The registry every server starts with
pub fn default_registry() -> Result<SchemaRegistry, RegistryError> {
    use PacketVersion as V;

    SchemaRegistry::builder()
        .register_fn(
            EventKind::PostReactionAdd,
            V::V0,
            "post_reaction_v0",
            packets::encode_post_reaction_v0,
        )?
        .alias(EventKind::PostReactionAdd, V::V1, V::V0)?
        .register_fn(
            EventKind::PostReactionRemove,
            V::V0,
            "post_reaction_v0",
            packets::encode_post_reaction_v0,
        )?
        .alias(EventKind::PostReactionRemove, V::V1, V::V0)?
        .register_fn(EventKind::PostCreated, V::V0, "post_v0", packets::encode_post_v0)?
        .register_fn(EventKind::PostCreated, V::V1, "post_v1", packets::encode_post_v1)?
        .register_fn(EventKind::PostUpdated, V::V0, "post_v0", packets::encode_post_v0)?
        .register_fn(EventKind::PostUpdated, V::V1, "post_v1", packets::encode_post_v1)?
        .register_fn(
            EventKind::PostDeleted,
            V::V0,
            "post_deleted_v0",
            packets::encode_post_deleted_v0,
        )?
        .alias(EventKind::PostDeleted, V::V1, V::V0)?
        .register_fn(
            EventKind::ChatCreated,
            V::V0,
            "chat_created_v0",
            packets::encode_chat_created_v0,
        )?
        .alias(EventKind::ChatCreated, V::V1, V::V0)?
        .register_fn(
            EventKind::ChatUpdated,
            V::V0,
            "chat_updated_v0",
            packets::encode_chat_updated_v0,
        )?
        .alias(EventKind::ChatUpdated, V::V1, V::V0)?
        .register_fn(
            EventKind::ChatDeleted,
            V::V0,
            "chat_deleted_v0",
            packets::encode_chat_deleted_v0,
        )?
        .alias(EventKind::ChatDeleted, V::V1, V::V0)?
        // Typing indicators never got a v1 packet
        .register_fn(
            EventKind::TypingStart,
            V::V0,
            "typing_start_v0",
            packets::encode_typing_start_v0,
        )?
        .policy(EventKind::TypingStart, VersionPolicy::NearestOlder)
        .build()
}
