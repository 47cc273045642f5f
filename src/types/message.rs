use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::Role;

/// Identity of a message within a store.
///
/// Ids are allocated in increasing order and never reused, so a streaming
/// update can always find its target even while other turns are appended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    /// Wraps a raw id.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One turn of the conversation as displayed and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique id within the store.
    pub id: MessageId,

    /// Who wrote the turn.
    pub role: Role,

    /// The text; grows while the turn is streaming.
    pub text: String,

    /// When the turn was created.
    #[serde(with = "crate::utils::time")]
    pub timestamp: OffsetDateTime,

    /// Set when the text is an error notice rather than a reply.
    #[serde(default)]
    pub is_error: bool,

    /// Set on the system-authored greeting left by a history reset.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub greeting: bool,
}

impl Message {
    /// Create a new message stamped with the current time.
    pub fn new(id: MessageId, role: Role, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            timestamp: OffsetDateTime::now_utc(),
            is_error: false,
            greeting: false,
        }
    }

    /// Returns true for an empty model turn still waiting on fragments.
    pub fn is_placeholder(&self) -> bool {
        self.role == Role::Model && self.text.is_empty() && !self.is_error && !self.greeting
    }

    /// Returns true if the turn belongs in the history sent to the API.
    pub fn is_conversational(&self) -> bool {
        !self.is_error && !self.greeting && !self.is_placeholder()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn message_round_trips_with_rfc3339_timestamp() {
        let message = Message {
            id: MessageId::new(3),
            role: Role::User,
            text: "Hi".to_string(),
            timestamp: datetime!(2025-03-01 12:30:00 UTC),
            is_error: false,
            greeting: false,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 3,
                "role": "user",
                "text": "Hi",
                "timestamp": "2025-03-01T12:30:00Z",
                "isError": false
            })
        );
        let back: Message = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn placeholder_detection() {
        let mut message = Message::new(MessageId::new(1), Role::Model, "");
        assert!(message.is_placeholder());
        assert!(!message.is_conversational());
        message.text.push_str("Hel");
        assert!(!message.is_placeholder());
        assert!(message.is_conversational());
        message.is_error = true;
        assert!(!message.is_conversational());
    }

    #[test]
    fn empty_user_turn_is_not_a_placeholder() {
        let message = Message::new(MessageId::new(1), Role::User, "");
        assert!(!message.is_placeholder());
    }
}
