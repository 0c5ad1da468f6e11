//! Deterministic [`ChatService`] for tests and demos.
//!
//! Serves whatever chats and histories it was given, after a fixed latency.
//! Each request kind can be switched to fail, and every call is counted so
//! tests can assert how many round trips a store issued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use parley_proto::{Chat, ChatId, Message, MessageId, MessageStatus, Timestamp, UserId};

use super::{ChatService, ServiceError};

/// Scripted backend with call counters and failure switches.
#[derive(Default)]
pub struct ScriptedService {
    latency: Duration,
    chats: Mutex<Vec<Chat>>,
    histories: Mutex<HashMap<ChatId, Vec<Message>>>,
    fail_list_chats: AtomicBool,
    fail_list_messages: AtomicBool,
    fail_send: AtomicBool,
    list_chats_calls: AtomicUsize,
    list_messages_calls: Mutex<HashMap<ChatId, usize>>,
    send_calls: AtomicUsize,
}

impl ScriptedService {
    /// Creates an empty service answering after `latency`.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Sets the chat directory served by `list_chats`.
    #[must_use]
    pub fn with_chats(self, chats: Vec<Chat>) -> Self {
        *self.chats.lock() = chats;
        self
    }

    /// Sets the history served for `chat_id`.
    #[must_use]
    pub fn with_history(self, chat_id: ChatId, messages: Vec<Message>) -> Self {
        self.set_history(chat_id, messages);
        self
    }

    /// Replaces the history served for `chat_id`.
    pub fn set_history(&self, chat_id: ChatId, messages: Vec<Message>) {
        self.histories.lock().insert(chat_id, messages);
    }

    /// Makes `list_chats` fail (or succeed again).
    pub fn fail_list_chats(&self, fail: bool) {
        self.fail_list_chats.store(fail, Ordering::SeqCst);
    }

    /// Makes `list_messages` fail (or succeed again).
    pub fn fail_list_messages(&self, fail: bool) {
        self.fail_list_messages.store(fail, Ordering::SeqCst);
    }

    /// Makes `send_message` fail (or succeed again).
    pub fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Number of `list_chats` requests received.
    #[must_use]
    pub fn list_chats_calls(&self) -> usize {
        self.list_chats_calls.load(Ordering::SeqCst)
    }

    /// Number of `list_messages` requests received for `chat_id`.
    #[must_use]
    pub fn list_messages_calls(&self, chat_id: &ChatId) -> usize {
        self.list_messages_calls
            .lock()
            .get(chat_id)
            .copied()
            .unwrap_or(0)
    }

    /// Number of `send_message` requests received.
    #[must_use]
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }
}

impl ChatService for ScriptedService {
    async fn list_chats(&self) -> Result<Vec<Chat>, ServiceError> {
        self.list_chats_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if self.fail_list_chats.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable("chat directory offline".into()));
        }
        Ok(self.chats.lock().clone())
    }

    async fn list_messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, ServiceError> {
        *self
            .list_messages_calls
            .lock()
            .entry(chat_id.clone())
            .or_default() += 1;
        tokio::time::sleep(self.latency).await;
        if self.fail_list_messages.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable(format!(
                "history for {chat_id} offline"
            )));
        }
        Ok(self
            .histories
            .lock()
            .get(chat_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(&self, chat_id: &ChatId, text: &str) -> Result<Message, ServiceError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ServiceError::Rejected("send refused".into()));
        }
        Ok(Message {
            id: MessageId::new(),
            chat_id: chat_id.clone(),
            text: text.to_string(),
            sender_id: UserId::current(),
            timestamp: Timestamp::now(),
            status: MessageStatus::Sent,
        })
    }
}
