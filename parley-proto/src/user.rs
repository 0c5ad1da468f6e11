//! User identities.
//!
//! One distinguished identity, the current user, decides message
//! ownership: every `sender_id` comparison is made against it.

use serde::{Deserialize, Serialize};

/// Identifier of the local user.
pub const CURRENT_USER_ID: &str = "current-user";

/// Identifies a user (and, for direct chats, the chat with that user).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user identifier from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity of the local user.
    #[must_use]
    pub fn current() -> Self {
        Self(CURRENT_USER_ID.to_string())
    }

    /// Returns `true` if this is the local user.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.0 == CURRENT_USER_ID
    }

    /// Returns the string representation of this user ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Avatar reference (URL or asset key).
    pub avatar: String,
    /// Presence hint, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
}

impl User {
    /// The local user.
    #[must_use]
    pub fn current() -> Self {
        Self {
            id: UserId::current(),
            name: "You".to_string(),
            avatar: format!("avatar://{CURRENT_USER_ID}"),
            is_online: Some(true),
        }
    }
}
