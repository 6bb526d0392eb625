// Wire packets for every event kind, one struct per distinct wire shape.
//
// Versions that share a shape are declared as aliases in the registry rather
// than getting their own struct here.

use bytes::Bytes;
use serde::Serialize;

use super::encoder::write_frame;
use super::error::EncodeError;
use super::version::WireFormat;
use crate::event::{DomainEvent, EventPayload, Permissions, User};

#[derive(Debug, Serialize)]
pub struct UserPacket<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub flags: i64,
    pub icon: &'a str,
    pub quote: &'a str,
    pub created: i64,
}

impl<'a> From<&'a User> for UserPacket<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            id: &user.id,
            username: &user.username,
            flags: user.flags,
            icon: &user.icon,
            quote: &user.quote,
            created: user.created,
        }
    }
}

/// `post_reaction_add` / `post_reaction_remove`, v0 (v1 is an alias)
#[derive(Debug, Serialize)]
pub struct V0PostReaction<'a> {
    pub chat_id: &'a str,
    pub post_id: &'a str,
    pub emoji: &'a str,
    pub user: Option<UserPacket<'a>>,
    pub username: &'a str,
}

/// Legacy post shape with the short field names old clients expect
#[derive(Debug, Serialize)]
pub struct V0Post<'a> {
    pub origin: &'a str,
    pub post_id: &'a str,
    pub u: &'a str,
    pub p: &'a str,
    /// Unix seconds
    pub t: i64,
}

#[derive(Debug, Serialize)]
pub struct V1Post<'a> {
    pub chat_id: &'a str,
    pub post_id: &'a str,
    pub content: &'a str,
    pub author: Option<UserPacket<'a>>,
    pub username: &'a str,
    pub created: i64,
}

#[derive(Debug, Serialize)]
pub struct V0PostDeleted<'a> {
    pub chat_id: &'a str,
    pub post_id: &'a str,
}

/// `chat_created`, the chat as the receiving user now sees it
#[derive(Debug, Serialize)]
pub struct V0Chat<'a> {
    pub id: &'a str,
    pub name: Option<&'a str>,
    pub direct: bool,
    pub flags: i64,
    pub members: Vec<UserPacket<'a>>,
    pub permissions: &'a Permissions,
    pub invite_code: Option<&'a str>,
    pub created: i64,
}

#[derive(Debug, Serialize)]
pub struct V0ChatUpdated<'a> {
    pub chat_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<UserPacket<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<&'a Permissions>,
}

#[derive(Debug, Serialize)]
pub struct V0ChatDeleted<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct V0TypingStart<'a> {
    pub chat_id: &'a str,
    pub user_id: &'a str,
}

fn mismatch(encoder: &'static str, event: &DomainEvent) -> EncodeError {
    EncodeError::PayloadMismatch {
        encoder,
        found: event.kind(),
    }
}

pub fn encode_post_reaction_v0(
    event: &DomainEvent,
    format: WireFormat,
) -> Result<Bytes, EncodeError> {
    let (EventPayload::PostReactionAdd(reaction) | EventPayload::PostReactionRemove(reaction)) =
        event.payload()
    else {
        return Err(mismatch("post_reaction_v0", event));
    };

    let packet = V0PostReaction {
        chat_id: &reaction.chat_id,
        post_id: &reaction.post_id,
        emoji: &reaction.emoji,
        user: reaction.user.as_ref().map(UserPacket::from),
        username: &reaction.username,
    };
    write_frame(event.kind(), &packet, format)
}

pub fn encode_post_v0(event: &DomainEvent, format: WireFormat) -> Result<Bytes, EncodeError> {
    let (EventPayload::PostCreated(post) | EventPayload::PostUpdated(post)) = event.payload()
    else {
        return Err(mismatch("post_v0", event));
    };

    let packet = V0Post {
        origin: &post.chat_id,
        post_id: &post.post_id,
        u: &post.username,
        p: &post.content,
        t: post.posted_at.timestamp(),
    };
    write_frame(event.kind(), &packet, format)
}

pub fn encode_post_v1(event: &DomainEvent, format: WireFormat) -> Result<Bytes, EncodeError> {
    let (EventPayload::PostCreated(post) | EventPayload::PostUpdated(post)) = event.payload()
    else {
        return Err(mismatch("post_v1", event));
    };

    let packet = V1Post {
        chat_id: &post.chat_id,
        post_id: &post.post_id,
        content: &post.content,
        author: post.author.as_ref().map(UserPacket::from),
        username: &post.username,
        created: post.posted_at.timestamp(),
    };
    write_frame(event.kind(), &packet, format)
}

pub fn encode_post_deleted_v0(
    event: &DomainEvent,
    format: WireFormat,
) -> Result<Bytes, EncodeError> {
    let EventPayload::PostDeleted(deleted) = event.payload() else {
        return Err(mismatch("post_deleted_v0", event));
    };

    let packet = V0PostDeleted {
        chat_id: &deleted.chat_id,
        post_id: &deleted.post_id,
    };
    write_frame(event.kind(), &packet, format)
}

pub fn encode_chat_updated_v0(
    event: &DomainEvent,
    format: WireFormat,
) -> Result<Bytes, EncodeError> {
    let EventPayload::ChatUpdated(chat) = event.payload() else {
        return Err(mismatch("chat_updated_v0", event));
    };

    let packet = V0ChatUpdated {
        chat_id: &chat.chat_id,
        name: chat.name.as_deref(),
        invite_code: chat.invite_code.as_deref(),
        members: chat
            .members
            .as_ref()
            .map(|members| members.iter().map(UserPacket::from).collect()),
        permissions: chat.permissions.as_ref(),
    };
    write_frame(event.kind(), &packet, format)
}

pub fn encode_chat_created_v0(
    event: &DomainEvent,
    format: WireFormat,
) -> Result<Bytes, EncodeError> {
    let EventPayload::ChatCreated(chat) = event.payload() else {
        return Err(mismatch("chat_created_v0", event));
    };

    let packet = V0Chat {
        id: &chat.chat_id,
        name: chat.name.as_deref(),
        direct: chat.direct,
        flags: chat.flags,
        members: chat.members.iter().map(UserPacket::from).collect(),
        permissions: &chat.permissions,
        invite_code: chat.invite_code.as_deref(),
        created: chat.created,
    };
    write_frame(event.kind(), &packet, format)
}

pub fn encode_chat_deleted_v0(
    event: &DomainEvent,
    format: WireFormat,
) -> Result<Bytes, EncodeError> {
    let EventPayload::ChatDeleted(deleted) = event.payload() else {
        return Err(mismatch("chat_deleted_v0", event));
    };

    write_frame(event.kind(), &V0ChatDeleted { id: &deleted.chat_id }, format)
}

pub fn encode_typing_start_v0(
    event: &DomainEvent,
    format: WireFormat,
) -> Result<Bytes, EncodeError> {
    let EventPayload::TypingStart(typing) = event.payload() else {
        return Err(mismatch("typing_start_v0", event));
    };

    let packet = V0TypingStart {
        chat_id: &typing.chat_id,
        user_id: &typing.user_id,
    };
    write_frame(event.kind(), &packet, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ChatPayload, ChatUpdatedPayload, PostPayload, TypingPayload};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    fn sample_post() -> DomainEvent {
        DomainEvent::new(
            "c1",
            EventPayload::PostCreated(PostPayload {
                chat_id: "c1".to_string(),
                post_id: "p1".to_string(),
                content: "hello".to_string(),
                author: None,
                username: "alice".to_string(),
                posted_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            }),
        )
    }

    #[test]
    fn test_post_reaction_json_shape() {
        let event = DomainEvent::post_reaction_add("c1", "p1", "👍", None, "alice");

        let bytes = encode_post_reaction_v0(&event, WireFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            value,
            json!({
                "cmd": "post_reaction_add",
                "val": {
                    "chat_id": "c1",
                    "post_id": "p1",
                    "emoji": "👍",
                    "user": null,
                    "username": "alice"
                }
            })
        );
    }

    #[test]
    fn test_post_reaction_carries_full_user() {
        let mut user = User::new("u1", "alice");
        user.quote = "hi".to_string();
        let event = DomainEvent::post_reaction_add("c1", "p1", "👍", Some(user), "alice");

        let bytes = encode_post_reaction_v0(&event, WireFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["val"]["user"]["id"], "u1");
        assert_eq!(value["val"]["user"]["quote"], "hi");
    }

    #[test]
    fn test_post_reaction_msgpack_is_a_map() {
        let event = DomainEvent::post_reaction_add("c1", "p1", "👍", None, "alice");

        let bytes = encode_post_reaction_v0(&event, WireFormat::MessagePack).unwrap();
        let value: Value = rmp_serde::from_slice(&bytes).unwrap();

        assert_eq!(value["cmd"], "post_reaction_add");
        assert_eq!(value["val"]["emoji"], "👍");
        assert_eq!(value["val"]["username"], "alice");
    }

    #[test]
    fn test_legacy_post_uses_short_field_names() {
        let bytes = encode_post_v0(&sample_post(), WireFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            value["val"],
            json!({
                "origin": "c1",
                "post_id": "p1",
                "u": "alice",
                "p": "hello",
                "t": 1_700_000_000
            })
        );
    }

    #[test]
    fn test_v1_post_uses_current_field_names() {
        let bytes = encode_post_v1(&sample_post(), WireFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["val"]["chat_id"], "c1");
        assert_eq!(value["val"]["content"], "hello");
        assert_eq!(value["val"]["created"], 1_700_000_000);
        assert!(value["val"].get("u").is_none());
    }

    #[test]
    fn test_chat_updated_omits_unchanged_fields() {
        let event = DomainEvent::new(
            "c1",
            EventPayload::ChatUpdated(ChatUpdatedPayload {
                chat_id: "c1".to_string(),
                name: None,
                invite_code: None,
                members: None,
                permissions: Some(Permissions::from([("u1".to_string(), 2)])),
            }),
        );

        let bytes = encode_chat_updated_v0(&event, WireFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(
            value["val"],
            json!({ "chat_id": "c1", "permissions": { "u1": 2 } })
        );
    }

    #[test]
    fn test_chat_created_carries_the_whole_chat() {
        let chat = ChatPayload {
            chat_id: "c9".to_string(),
            name: Some("general".to_string()),
            direct: false,
            flags: 0,
            members: vec![User::new("u1", "alice")],
            permissions: Permissions::from([("u1".to_string(), 2)]),
            invite_code: Some("abc123".to_string()),
            created: 1_700_000_000,
        };
        let event = DomainEvent::chat_created("u1", chat);

        let bytes = encode_chat_created_v0(&event, WireFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["cmd"], "chat_created");
        assert_eq!(value["val"]["id"], "c9");
        assert_eq!(value["val"]["members"][0]["username"], "alice");
        assert_eq!(value["val"]["permissions"]["u1"], 2);
        assert!(value["val"].get("chat_id").is_none());
    }

    #[test]
    fn test_chat_deleted_is_just_the_id() {
        let event = DomainEvent::chat_deleted("u1", "c9");

        let bytes = encode_chat_deleted_v0(&event, WireFormat::Json).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value, json!({ "cmd": "chat_deleted", "val": { "id": "c9" } }));
    }

    #[test]
    fn test_encoder_rejects_foreign_payload() {
        let event = DomainEvent::new(
            "c1",
            EventPayload::TypingStart(TypingPayload {
                chat_id: "c1".to_string(),
                user_id: "u1".to_string(),
            }),
        );

        let result = encode_post_reaction_v0(&event, WireFormat::Json);

        assert!(matches!(
            result,
            Err(EncodeError::PayloadMismatch {
                encoder: "post_reaction_v0",
                ..
            })
        ));
    }
}
