//! Shared data model for the `Parley` chat engine.
//!
//! Pure value types: identifiers, timestamps, users, messages with their
//! delivery status state machine, and chat summaries. No runtime lives here.

pub mod chat;
pub mod message;
pub mod user;

pub use chat::{Chat, ChatId};
pub use message::{Message, MessageId, MessageStatus, StatusError, Timestamp};
pub use user::{CURRENT_USER_ID, User, UserId};
