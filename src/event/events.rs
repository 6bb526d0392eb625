use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use super::error::{Malformed, SubmitError};

/// Routing key subscribers attach to, usually a chat id or a user id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicKey(String);

impl TopicKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TopicKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TopicKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for TopicKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Every kind of event the platform pushes to live connections
///
/// The snake_case name doubles as the `cmd` of the wire envelope.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    PostCreated,
    PostUpdated,
    PostDeleted,
    PostReactionAdd,
    PostReactionRemove,
    ChatCreated,
    ChatUpdated,
    ChatDeleted,
    TypingStart,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Profile of the user behind an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub flags: i64,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub quote: String,
    /// Account creation time, unix seconds
    #[serde(default)]
    pub created: i64,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            flags: 0,
            icon: String::new(),
            quote: String::new(),
            created: 0,
        }
    }
}

/// A reaction added to or removed from a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub chat_id: String,
    pub post_id: String,
    pub emoji: String,
    pub user: Option<User>,
    pub username: String,
}

/// A post as it was created or after an edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPayload {
    pub chat_id: String,
    pub post_id: String,
    pub content: String,
    pub author: Option<User>,
    pub username: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDeletedPayload {
    pub chat_id: String,
    pub post_id: String,
}

/// Chat member permission levels keyed by user id
pub type Permissions = BTreeMap<String, i64>;

/// The full chat, sent to a user's own topic when they gain access to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub chat_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub direct: bool,
    #[serde(default)]
    pub flags: i64,
    #[serde(default)]
    pub members: Vec<User>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub invite_code: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub created: i64,
}

/// Chat settings that changed; unchanged fields stay `None`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUpdatedPayload {
    pub chat_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub invite_code: Option<String>,
    #[serde(default)]
    pub members: Option<Vec<User>>,
    #[serde(default)]
    pub permissions: Option<Permissions>,
}

/// A user lost access to a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDeletedPayload {
    pub chat_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingPayload {
    pub chat_id: String,
    pub user_id: String,
}

/// Kind-specific event data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    PostCreated(PostPayload),
    PostUpdated(PostPayload),
    PostDeleted(PostDeletedPayload),
    PostReactionAdd(ReactionPayload),
    PostReactionRemove(ReactionPayload),
    ChatCreated(ChatPayload),
    ChatUpdated(ChatUpdatedPayload),
    ChatDeleted(ChatDeletedPayload),
    TypingStart(TypingPayload),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::PostCreated(_) => EventKind::PostCreated,
            EventPayload::PostUpdated(_) => EventKind::PostUpdated,
            EventPayload::PostDeleted(_) => EventKind::PostDeleted,
            EventPayload::PostReactionAdd(_) => EventKind::PostReactionAdd,
            EventPayload::PostReactionRemove(_) => EventKind::PostReactionRemove,
            EventPayload::ChatCreated(_) => EventKind::ChatCreated,
            EventPayload::ChatUpdated(_) => EventKind::ChatUpdated,
            EventPayload::ChatDeleted(_) => EventKind::ChatDeleted,
            EventPayload::TypingStart(_) => EventKind::TypingStart,
        }
    }

    pub fn chat_id(&self) -> &str {
        match self {
            EventPayload::PostCreated(p) | EventPayload::PostUpdated(p) => &p.chat_id,
            EventPayload::PostDeleted(p) => &p.chat_id,
            EventPayload::PostReactionAdd(p) | EventPayload::PostReactionRemove(p) => &p.chat_id,
            EventPayload::ChatCreated(p) => &p.chat_id,
            EventPayload::ChatUpdated(p) => &p.chat_id,
            EventPayload::ChatDeleted(p) => &p.chat_id,
            EventPayload::TypingStart(p) => &p.chat_id,
        }
    }

    fn validate(&self) -> Result<(), Malformed> {
        let kind = self.kind();
        require(kind, "chat_id", self.chat_id())?;

        match self {
            EventPayload::PostCreated(p) | EventPayload::PostUpdated(p) => {
                require(kind, "post_id", &p.post_id)?;
                require(kind, "username", &p.username)
            }
            EventPayload::PostDeleted(p) => require(kind, "post_id", &p.post_id),
            EventPayload::PostReactionAdd(p) | EventPayload::PostReactionRemove(p) => {
                require(kind, "post_id", &p.post_id)?;
                require(kind, "emoji", &p.emoji)?;
                require(kind, "username", &p.username)?;
                validate_emoji(&p.emoji)
            }
            EventPayload::ChatCreated(_)
            | EventPayload::ChatUpdated(_)
            | EventPayload::ChatDeleted(_) => Ok(()),
            EventPayload::TypingStart(p) => require(kind, "user_id", &p.user_id),
        }
    }
}

fn require(kind: EventKind, field: &'static str, value: &str) -> Result<(), Malformed> {
    if value.trim().is_empty() {
        return Err(Malformed::MissingField { kind, field });
    }
    Ok(())
}

/// An emoji is a single token: either a unicode emoji sequence or a custom
/// emoji reference, never something with spaces in it
fn validate_emoji(emoji: &str) -> Result<(), Malformed> {
    if emoji.chars().any(char::is_whitespace) {
        return Err(Malformed::InvalidEmoji(emoji.to_string()));
    }
    Ok(())
}

/// An immutable fact produced by the application layer
///
/// Events represent things that have already happened. They are routed by
/// topic and encoded per subscriber at dispatch time.
#[derive(Debug, Clone)]
pub struct DomainEvent {
    id: Uuid,
    topic: TopicKey,
    payload: EventPayload,
    created_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(topic: impl Into<TopicKey>, payload: EventPayload) -> Self {
        Self::with_timestamp(topic, payload, Utc::now())
    }

    pub fn with_timestamp(
        topic: impl Into<TopicKey>,
        payload: EventPayload,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic: topic.into(),
            payload,
            created_at,
        }
    }

    /// Shortcut for the most common event: a reaction landing on a post in a chat
    pub fn post_reaction_add(
        chat_id: &str,
        post_id: &str,
        emoji: &str,
        user: Option<User>,
        username: &str,
    ) -> Self {
        Self::new(
            chat_id,
            EventPayload::PostReactionAdd(ReactionPayload {
                chat_id: chat_id.to_string(),
                post_id: post_id.to_string(),
                emoji: emoji.to_string(),
                user,
                username: username.to_string(),
            }),
        )
    }

    /// A chat became visible to `user_id`; routed to that user's topic
    pub fn chat_created(user_id: &str, chat: ChatPayload) -> Self {
        Self::new(user_id, EventPayload::ChatCreated(chat))
    }

    /// `user_id` left or lost a chat; routed to that user's topic
    pub fn chat_deleted(user_id: &str, chat_id: &str) -> Self {
        Self::new(
            user_id,
            EventPayload::ChatDeleted(ChatDeletedPayload {
                chat_id: chat_id.to_string(),
            }),
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    pub fn topic(&self) -> &TopicKey {
        &self.topic
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Checks the event is well-formed enough to be routed and encoded
    pub fn validate(&self) -> Result<(), SubmitError> {
        if self.topic.is_empty() {
            return Err(Malformed::MissingTopic.into());
        }
        Ok(self.payload.validate()?)
    }
}
