//! Chat directory: the ordered chat list, the selection and unread counters.
//!
//! The list is always sorted descending by [`Chat::last_own_message_at`],
//! the timestamp of the current user's latest message in each chat. Ties
//! keep their relative order, so the result of every mutation equals a full
//! stable sort. Chats are only replaced wholesale by
//! [`fetch_directory`](ChatDirectory::fetch_directory); every other
//! operation mutates them in place.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use parley_proto::{Chat, ChatId, Message};

use crate::service::ChatService;

/// Capability the message log uses to keep chat summaries in sync.
///
/// [`ChatDirectory`] implements it; tests can substitute a recorder.
pub trait DirectorySink: Send + Sync {
    /// Replace the chat's last message and reposition the chat.
    fn update_last_message(&self, chat_id: &ChatId, message: Message);

    /// Count one unread message unless the chat is selected.
    fn increment_unread_count(&self, chat_id: &ChatId);
}

/// Read-only copy of the directory state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySnapshot {
    /// Chats in display order.
    pub chats: Vec<Chat>,
    /// Currently selected chat.
    pub selected_chat_id: Option<ChatId>,
    /// Whether a directory fetch is in flight.
    pub is_loading: bool,
    /// Last fetch error, displayable as-is.
    pub error: Option<String>,
}

/// Owner of the chat list.
pub struct ChatDirectory<S> {
    service: Arc<S>,
    state: Mutex<DirectorySnapshot>,
}

impl<S: ChatService> ChatDirectory<S> {
    /// Creates an empty directory backed by `service`.
    pub fn new(service: Arc<S>) -> Self {
        Self {
            service,
            state: Mutex::new(DirectorySnapshot::default()),
        }
    }

    /// Loads the chat list, replacing the current one on success.
    ///
    /// Each fetched chat gets its sort key derived from its last message.
    /// On failure the error is recorded for display and the existing chats
    /// are kept.
    pub async fn fetch_directory(&self) {
        {
            let mut state = self.state.lock();
            state.is_loading = true;
            state.error = None;
        }

        let result = self.service.list_chats().await;

        let mut state = self.state.lock();
        state.is_loading = false;
        match result {
            Ok(mut chats) => {
                for chat in &mut chats {
                    chat.last_own_message_at = chat.derived_own_timestamp();
                }
                chats.sort_by(|a, b| b.last_own_message_at.cmp(&a.last_own_message_at));
                tracing::info!(chats = chats.len(), "chat directory loaded");
                state.chats = chats;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch chat directory");
                state.error = Some(e.to_string());
            }
        }
    }
}

impl<S> ChatDirectory<S> {
    /// Selects `chat_id` and clears its unread counter.
    ///
    /// Does not fetch messages; that is up to whoever observes selection.
    pub fn select_chat(&self, chat_id: &ChatId) {
        let mut state = self.state.lock();
        state.selected_chat_id = Some(chat_id.clone());
        if let Some(chat) = state.chats.iter_mut().find(|c| c.id == *chat_id) {
            chat.unread_count = 0;
        }
    }

    /// Sets the unread counter of `chat_id` to zero.
    pub fn reset_unread_count(&self, chat_id: &ChatId) {
        if let Some(chat) = self.state.lock().chats.iter_mut().find(|c| c.id == *chat_id) {
            chat.unread_count = 0;
        }
    }

    /// Chats in display order.
    #[must_use]
    pub fn chats(&self) -> Vec<Chat> {
        self.state.lock().chats.clone()
    }

    /// A single chat by id.
    #[must_use]
    pub fn chat(&self, chat_id: &ChatId) -> Option<Chat> {
        self.state
            .lock()
            .chats
            .iter()
            .find(|c| c.id == *chat_id)
            .cloned()
    }

    /// The selected chat id, if any.
    #[must_use]
    pub fn selected_chat_id(&self) -> Option<ChatId> {
        self.state.lock().selected_chat_id.clone()
    }

    /// The selected chat, if it exists in the list.
    #[must_use]
    pub fn selected_chat(&self) -> Option<Chat> {
        let state = self.state.lock();
        let selected = state.selected_chat_id.as_ref()?;
        state.chats.iter().find(|c| c.id == *selected).cloned()
    }

    /// Whether a directory fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading
    }

    /// The last fetch error.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Copy of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> DirectorySnapshot {
        self.state.lock().clone()
    }
}

impl<S: Send + Sync> DirectorySink for ChatDirectory<S> {
    fn update_last_message(&self, chat_id: &ChatId, message: Message) {
        let mut state = self.state.lock();
        let Some(index) = state.chats.iter().position(|c| c.id == *chat_id) else {
            tracing::debug!(chat = %chat_id, "last message for unknown chat ignored");
            return;
        };

        let mut chat = state.chats.remove(index);
        if message.is_own() {
            chat.last_own_message_at = chat.last_own_message_at.max(message.timestamp);
        }
        chat.last_message = Some(message);

        let position = sorted_position(&state.chats, &chat, index);
        state.chats.insert(position, chat);
    }

    fn increment_unread_count(&self, chat_id: &ChatId) {
        let mut state = self.state.lock();
        if state.selected_chat_id.as_ref() == Some(chat_id) {
            return;
        }
        if let Some(chat) = state.chats.iter_mut().find(|c| c.id == *chat_id) {
            chat.unread_count = chat.unread_count.saturating_add(1);
        }
    }
}

/// Where `chat`, just removed from `previous_index`, goes back into the
/// descending-sorted `chats`.
///
/// Among chats with an equal key it keeps its former rank, which makes the
/// result identical to a stable sort of the whole list.
fn sorted_position(chats: &[Chat], chat: &Chat, previous_index: usize) -> usize {
    let key = chat.last_own_message_at;
    let first_equal = chats.partition_point(|c| c.last_own_message_at > key);
    let past_equal = chats.partition_point(|c| c.last_own_message_at >= key);
    previous_index.clamp(first_equal, past_equal)
}
