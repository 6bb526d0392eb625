use thiserror::Error;

use super::events::EventKind;

/// Errors surfaced to producers when an event cannot be accepted
///
/// These are the only failures a producer ever sees. Anything that goes wrong
/// while delivering to a particular subscriber stays inside the dispatcher.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Malformed event: {0}")]
    Malformed(#[from] Malformed),
}

/// What exactly is wrong with a rejected event
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Malformed {
    #[error("event has no topic key")]
    MissingTopic,

    #[error("missing required field `{field}` on {kind} event")]
    MissingField {
        kind: EventKind,
        field: &'static str,
    },

    #[error("emoji must be a single token, got {0:?}")]
    InvalidEmoji(String),
}
