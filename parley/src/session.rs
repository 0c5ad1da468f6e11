//! Composition layer tying the stores to the service and the incoming feed.
//!
//! A [`Session`] is what a front end holds. It wires [`MessageLog`] to
//! [`ChatDirectory`] at construction, turns chat selection into a history
//! fetch, routes composer text to the selected chat and forwards incoming
//! feed messages into the log. Reads go through [`ChatsView`] and
//! [`MessagesView`] snapshots.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use parley_proto::{Chat, ChatId, Message, MessageId};

use crate::delay::DelayProvider;
use crate::directory::ChatDirectory;
use crate::log::{LogEvent, MessageLog};
use crate::service::{ChatService, IncomingFeed};

/// Read-only view of the chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatsView {
    /// Chats in display order.
    pub chats: Vec<Chat>,
    /// The selected chat, when it exists.
    pub selected_chat: Option<Chat>,
    /// Whether the directory is loading.
    pub is_loading: bool,
    /// Directory fetch error.
    pub error: Option<String>,
}

/// Read-only view of one chat's messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesView {
    /// The chat shown, if any.
    pub chat_id: Option<ChatId>,
    /// Messages in order.
    pub messages: Vec<Message>,
    /// Whether this chat's history is loading.
    pub is_loading: bool,
    /// Message fetch error (shared across chats).
    pub error: Option<String>,
}

/// Both stores plus their collaborators.
pub struct Session<S> {
    directory: Arc<ChatDirectory<S>>,
    log: Arc<MessageLog<S>>,
    feed: Option<IncomingFeed>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    feed_buffer: usize,
}

impl<S: ChatService + 'static> Session<S> {
    /// Builds the directory and the log over `service`.
    ///
    /// Returns the session and the log's event receiver.
    pub fn new(
        service: Arc<S>,
        delays: Arc<dyn DelayProvider>,
        event_buffer: usize,
    ) -> (Self, mpsc::Receiver<LogEvent>) {
        let directory = Arc::new(ChatDirectory::new(Arc::clone(&service)));
        let (log, events) = MessageLog::new(service, directory.clone(), delays, event_buffer);
        let session = Self {
            directory,
            log,
            feed: None,
            forwarder: Mutex::new(None),
            feed_buffer: event_buffer,
        };
        (session, events)
    }

    /// Attaches an incoming feed; it stays disconnected until
    /// [`connect_incoming`](Self::connect_incoming).
    #[must_use]
    pub fn with_incoming(mut self, feed: IncomingFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Loads the chat directory.
    pub async fn load(&self) {
        self.directory.fetch_directory().await;
    }

    /// Selects a chat and loads its history if it has not been loaded.
    pub async fn select_chat(&self, chat_id: &ChatId) {
        self.directory.select_chat(chat_id);
        self.log.fetch_messages(chat_id).await;
    }

    /// Selects a chat and starts loading its history in the background.
    ///
    /// Returns `true` when a fetch was started; completion is reported by
    /// [`LogEvent::MessagesLoaded`] or [`LogEvent::FetchFailed`]. Returns
    /// `false` when the history is already loaded or loading.
    pub fn open_chat(&self, chat_id: &ChatId) -> bool {
        self.directory.select_chat(chat_id);
        if self.log.is_loaded(chat_id) || self.log.is_loading(chat_id) {
            return false;
        }
        let log = Arc::clone(&self.log);
        let chat_id = chat_id.clone();
        tokio::spawn(async move { log.fetch_messages(&chat_id).await });
        true
    }

    /// Sends `text` to the selected chat.
    ///
    /// Returns `None` when no chat is selected.
    pub fn send(&self, text: impl Into<String>) -> Option<MessageId> {
        let chat_id = self.directory.selected_chat_id()?;
        Some(self.log.send_message(&chat_id, text))
    }

    /// Re-runs whichever fetch last failed.
    ///
    /// Both fetches skip work already done, so retrying is always safe.
    pub async fn retry(&self) {
        if self.directory.error().is_some() {
            self.directory.fetch_directory().await;
        }
        if self.log.error().is_some()
            && let Some(chat_id) = self.directory.selected_chat_id()
        {
            self.log.fetch_messages(&chat_id).await;
        }
    }

    /// Connects the incoming feed and starts forwarding its messages into
    /// the log. Returns `false` when no feed is attached.
    pub fn connect_incoming(&self) -> bool {
        let Some(feed) = &self.feed else {
            return false;
        };

        let mut forwarder = self.forwarder.lock();
        if forwarder.is_none() {
            let mut rx = feed.subscribe(self.feed_buffer);
            let log = Arc::clone(&self.log);
            *forwarder = Some(tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    log.add_message(message);
                }
            }));
        }
        feed.connect();
        true
    }

    /// Stops the incoming feed. Already forwarded messages stay.
    pub fn disconnect_incoming(&self) {
        if let Some(feed) = &self.feed {
            feed.disconnect();
        }
    }
}

impl<S> Session<S> {
    /// Whether the incoming feed is running.
    #[must_use]
    pub fn is_incoming_connected(&self) -> bool {
        self.feed.as_ref().is_some_and(IncomingFeed::is_connected)
    }

    /// The attached incoming feed.
    #[must_use]
    pub const fn feed(&self) -> Option<&IncomingFeed> {
        self.feed.as_ref()
    }

    /// The chat directory store.
    #[must_use]
    pub const fn directory(&self) -> &Arc<ChatDirectory<S>> {
        &self.directory
    }

    /// The message log store.
    #[must_use]
    pub const fn log(&self) -> &Arc<MessageLog<S>> {
        &self.log
    }

    /// Snapshot of the chat list.
    #[must_use]
    pub fn chats_view(&self) -> ChatsView {
        let snapshot = self.directory.snapshot();
        let selected_chat = snapshot.selected_chat_id.as_ref().and_then(|id| {
            snapshot.chats.iter().find(|c| c.id == *id).cloned()
        });
        ChatsView {
            chats: snapshot.chats,
            selected_chat,
            is_loading: snapshot.is_loading,
            error: snapshot.error,
        }
    }

    /// Snapshot of `chat_id`'s messages, or of the selected chat's when
    /// `chat_id` is `None`.
    #[must_use]
    pub fn messages_view(&self, chat_id: Option<&ChatId>) -> MessagesView {
        let chat_id = chat_id
            .cloned()
            .or_else(|| self.directory.selected_chat_id());
        let Some(chat_id) = chat_id else {
            return MessagesView {
                chat_id: None,
                messages: Vec::new(),
                is_loading: false,
                error: self.log.error(),
            };
        };
        MessagesView {
            messages: self.log.messages(&chat_id),
            is_loading: self.log.is_loading(&chat_id),
            error: self.log.error(),
            chat_id: Some(chat_id),
        }
    }
}

impl<S> Drop for Session<S> {
    fn drop(&mut self) {
        if let Some(task) = self.forwarder.lock().take() {
            task.abort();
        }
    }
}
