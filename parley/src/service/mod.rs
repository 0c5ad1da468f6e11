//! Transport stub consumed by the stores.
//!
//! Defines the [`ChatService`] request/response contract. Implementations:
//! - [`simulated::SimulatedService`]: generated mock data behind randomized
//!   latency and an optional failure rate
//! - [`scripted::ScriptedService`]: fixed data and switchable failures for tests
//!
//! The push side (randomly arriving messages) lives in [`incoming`].

pub mod incoming;
pub mod mock_data;
pub mod scripted;
pub mod simulated;

use std::future::Future;

use parley_proto::{Chat, ChatId, Message};

pub use incoming::{IncomingConfig, IncomingFeed};
pub use scripted::ScriptedService;
pub use simulated::{ServiceConfig, SimulatedService};

/// Errors a service request may resolve with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The service could not be reached or timed out.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The requested chat does not exist.
    #[error("unknown chat {0}")]
    UnknownChat(ChatId),

    /// The service refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// Asynchronous chat backend.
///
/// Every request resolves after an arbitrary delay and may fail.
pub trait ChatService: Send + Sync {
    /// Fetch every chat summary.
    fn list_chats(&self) -> impl Future<Output = Result<Vec<Chat>, ServiceError>> + Send;

    /// Fetch the full history of a chat in ascending timestamp order.
    fn list_messages(
        &self,
        chat_id: &ChatId,
    ) -> impl Future<Output = Result<Vec<Message>, ServiceError>> + Send;

    /// Submit a message. The returned message carries server-assigned
    /// identity, which callers holding an optimistic copy may ignore.
    fn send_message(
        &self,
        chat_id: &ChatId,
        text: &str,
    ) -> impl Future<Output = Result<Message, ServiceError>> + Send;
}
