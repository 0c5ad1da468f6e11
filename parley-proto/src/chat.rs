//! Chat summaries as tracked by the directory.

use serde::{Deserialize, Serialize};

use crate::message::{Message, Timestamp};

/// Identifies a chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    /// Creates a chat identifier from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string representation of this chat ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation summary.
///
/// Chats are ordered by [`last_own_message_at`](Self::last_own_message_at),
/// the timestamp of the current user's most recent message in the chat,
/// not by the most recent message overall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Unique identifier.
    pub id: ChatId,
    /// Display name.
    pub name: String,
    /// Avatar reference.
    pub avatar: String,
    /// Most recent message, if any.
    pub last_message: Option<Message>,
    /// Messages received while the chat was not selected.
    pub unread_count: u32,
    /// Sort key: timestamp of the current user's latest message, or zero.
    #[serde(default)]
    pub last_own_message_at: Timestamp,
}

impl Chat {
    /// Sort key derived from `last_message` alone: its timestamp when the
    /// current user sent it, zero otherwise.
    #[must_use]
    pub fn derived_own_timestamp(&self) -> Timestamp {
        self.last_message
            .as_ref()
            .filter(|m| m.is_own())
            .map_or(Timestamp::ZERO, |m| m.timestamp)
    }
}
