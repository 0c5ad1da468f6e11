//! Message log: per-chat message sequences and the optimistic send pipeline.
//!
//! [`MessageLog`] owns every chat's ordered messages, tracks which chats are
//! loading or loaded, and drives a sent message through its status
//! lifecycle:
//!
//! 1. [`send_message`](MessageLog::send_message) inserts the message as
//!    `Sending` before any round trip.
//! 2. When the service accepts it, the message becomes `Sent` and two
//!    timers are scheduled for `Delivered` and `Read`.
//! 3. When the service rejects it, the message becomes `Failed`.
//!
//! Status changes only move forward, so a late or duplicated transition is
//! dropped instead of regressing a message. Whenever the changed message is
//! its chat's tail, the directory's last message is refreshed as well.
//!
//! The log depends on the directory through [`DirectorySink`] and never the
//! other way round. Directory calls are made while the log's lock is held,
//! so the directory always sees a chat's updates in the log's order.

pub mod merge;
pub mod timers;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use parley_proto::{ChatId, Message, MessageId, MessageStatus, Timestamp, UserId};

use crate::delay::DelayProvider;
use crate::directory::DirectorySink;
use crate::service::ChatService;

use merge::merge_fetched;
use timers::PendingTimers;

/// Events emitted by the [`MessageLog`] for UI notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A message was appended to a chat.
    MessageAdded {
        /// The appended message.
        message: Message,
    },
    /// A message's delivery status changed.
    StatusChanged {
        /// Chat holding the message.
        chat_id: ChatId,
        /// The message whose status changed.
        message_id: MessageId,
        /// The new status.
        status: MessageStatus,
    },
    /// A chat's history finished loading.
    MessagesLoaded {
        /// The loaded chat.
        chat_id: ChatId,
        /// Messages held after merging.
        count: usize,
    },
    /// A history fetch failed.
    FetchFailed {
        /// The chat whose fetch failed.
        chat_id: ChatId,
        /// Displayable error.
        error: String,
    },
    /// A chat's messages were dropped.
    Cleared {
        /// The cleared chat.
        chat_id: ChatId,
    },
}

#[derive(Default)]
struct LogState {
    messages: HashMap<ChatId, Vec<Message>>,
    loading: HashSet<ChatId>,
    loaded: HashSet<ChatId>,
    /// Bumped by every clear; a fetch that started under an older
    /// generation is discarded.
    generations: HashMap<ChatId, u64>,
    error: Option<String>,
    timers: PendingTimers,
}

impl LogState {
    fn generation(&self, chat_id: &ChatId) -> u64 {
        self.generations.get(chat_id).copied().unwrap_or(0)
    }
}

/// Owner of all chats' message sequences.
pub struct MessageLog<S> {
    service: Arc<S>,
    directory: Arc<dyn DirectorySink>,
    delays: Arc<dyn DelayProvider>,
    state: Mutex<LogState>,
    event_tx: mpsc::Sender<LogEvent>,
}

impl<S: ChatService + 'static> MessageLog<S> {
    /// Creates an empty log.
    ///
    /// Returns the log and a receiver for [`LogEvent`]s. Events are sent
    /// with `try_send`; if the receiver lags or is dropped they are lost,
    /// but store mutations are never held up.
    pub fn new(
        service: Arc<S>,
        directory: Arc<dyn DirectorySink>,
        delays: Arc<dyn DelayProvider>,
        event_buffer: usize,
    ) -> (Arc<Self>, mpsc::Receiver<LogEvent>) {
        let (event_tx, event_rx) = mpsc::channel(event_buffer.max(1));
        let log = Arc::new(Self {
            service,
            directory,
            delays,
            state: Mutex::new(LogState::default()),
            event_tx,
        });
        (log, event_rx)
    }

    /// Loads a chat's history once.
    ///
    /// Does nothing if the chat is already loaded or a fetch for it is in
    /// flight. On success the fetched history is merged with everything the
    /// chat already held (including messages that arrived during the
    /// request), the chat is marked loaded and its newest message is pushed
    /// to the directory. On failure the error is recorded and the chat stays
    /// unloaded, so calling again retries.
    pub async fn fetch_messages(&self, chat_id: &ChatId) {
        let generation = {
            let mut state = self.state.lock();
            if state.loaded.contains(chat_id) || state.loading.contains(chat_id) {
                tracing::debug!(chat = %chat_id, "fetch skipped, already loaded or loading");
                return;
            }
            state.loading.insert(chat_id.clone());
            state.error = None;
            state.generation(chat_id)
        };

        let result = self.service.list_messages(chat_id).await;

        let mut state = self.state.lock();
        if state.generation(chat_id) != generation {
            tracing::debug!(chat = %chat_id, "chat cleared during fetch, result discarded");
            return;
        }
        state.loading.remove(chat_id);

        match result {
            Ok(fetched) => {
                let fetched_len = fetched.len();
                // Without an intervening clear, the live sequence holds every
                // pre-fetch message with its latest status.
                let current = state.messages.remove(chat_id).unwrap_or_default();
                let merged = merge_fetched(fetched, &current);
                let count = merged.len();
                let tail = merged.last().cloned();
                state.messages.insert(chat_id.clone(), merged);
                state.loaded.insert(chat_id.clone());

                if let Some(tail) = tail {
                    self.directory.update_last_message(chat_id, tail);
                }
                tracing::info!(
                    chat = %chat_id,
                    fetched = fetched_len,
                    local = current.len(),
                    merged = count,
                    "messages loaded"
                );
                self.emit(LogEvent::MessagesLoaded {
                    chat_id: chat_id.clone(),
                    count,
                });
            }
            Err(e) => {
                tracing::warn!(chat = %chat_id, error = %e, "failed to fetch messages");
                let error = e.to_string();
                state.error = Some(error.clone());
                self.emit(LogEvent::FetchFailed {
                    chat_id: chat_id.clone(),
                    error,
                });
            }
        }
    }

    /// Optimistically sends `text` to `chat_id`.
    ///
    /// The message is appended as `Sending` before this returns; the request
    /// then runs on a spawned task. The text is stored verbatim.
    ///
    /// Must be called from within a tokio runtime.
    pub fn send_message(self: &Arc<Self>, chat_id: &ChatId, text: impl Into<String>) -> MessageId {
        let message = Message {
            id: MessageId::new(),
            chat_id: chat_id.clone(),
            text: text.into(),
            sender_id: UserId::current(),
            timestamp: Timestamp::now(),
            status: MessageStatus::Sending,
        };
        let message_id = message.id.clone();
        let text = message.text.clone();
        self.add_message(message);

        let log = Arc::clone(self);
        let chat_id = chat_id.clone();
        let id = message_id.clone();
        tokio::spawn(async move {
            match log.service.send_message(&chat_id, &text).await {
                Ok(_) => {
                    if log.update_message_status(&chat_id, &id, MessageStatus::Sent) {
                        log.schedule_status_timers(&chat_id, &id);
                    }
                }
                Err(e) => {
                    tracing::warn!(chat = %chat_id, message_id = %id, error = %e, "send failed");
                    log.update_message_status(&chat_id, &id, MessageStatus::Failed);
                    log.clear_pending_timeouts(&id);
                }
            }
        });

        message_id
    }

    /// Schedules the `Delivered` and `Read` transitions for a sent message.
    ///
    /// Timers hold only a weak reference to the log and are recorded
    /// against the message id so they can be cancelled. Nothing is
    /// scheduled if the message was cleared or already reached a terminal
    /// status after its `Sent` transition. Returns whether timers were
    /// scheduled.
    fn schedule_status_timers(self: &Arc<Self>, chat_id: &ChatId, message_id: &MessageId) -> bool {
        let delivered = self.delays.delivered_delay();
        // Read must land strictly after Delivered.
        let read = self
            .delays
            .read_delay()
            .max(delivered + Duration::from_millis(1));

        let mut state = self.state.lock();
        let pending = state
            .messages
            .get(chat_id)
            .and_then(|messages| messages.iter().find(|m| m.id == *message_id))
            .is_some_and(|m| !m.status.is_terminal());
        if !pending {
            tracing::debug!(chat = %chat_id, %message_id, "message gone before timers, none scheduled");
            return false;
        }
        for (target, delay) in [
            (MessageStatus::Delivered, delivered),
            (MessageStatus::Read, read),
        ] {
            let log = Arc::downgrade(self);
            let chat_id = chat_id.clone();
            let id = message_id.clone();
            let task = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(log) = Weak::upgrade(&log) {
                    log.fire_timer(&chat_id, &id, target);
                }
            });
            state
                .timers
                .track(message_id.clone(), target, task.abort_handle());
        }
        tracing::debug!(
            message_id = %message_id,
            delivered_ms = delivered.as_millis(),
            read_ms = read.as_millis(),
            "status timers scheduled"
        );
        true
    }
}

impl<S> MessageLog<S> {
    fn emit(&self, event: LogEvent) {
        let _ = self.event_tx.try_send(event);
    }

    fn fire_timer(&self, chat_id: &ChatId, message_id: &MessageId, target: MessageStatus) {
        self.state.lock().timers.complete(message_id, target);
        self.update_message_status(chat_id, message_id, target);
    }

    /// Appends `message` to its chat and updates the directory.
    ///
    /// The message goes to the tail as given; callers supply messages in
    /// timestamp order. The directory's last message is replaced, and the
    /// unread counter grows for messages from other users.
    pub fn add_message(&self, message: Message) {
        let chat_id = message.chat_id.clone();
        let is_own = message.is_own();

        let mut state = self.state.lock();
        state
            .messages
            .entry(chat_id.clone())
            .or_default()
            .push(message.clone());

        self.directory.update_last_message(&chat_id, message.clone());
        if !is_own {
            self.directory.increment_unread_count(&chat_id);
        }
        drop(state);

        tracing::debug!(chat = %chat_id, message_id = %message.id, own = is_own, "message added");
        self.emit(LogEvent::MessageAdded { message });
    }

    /// Moves a message to `status` if that is a forward transition.
    ///
    /// Returns `true` if the status changed. Unknown chats or messages and
    /// regressions are ignored. Reaching a terminal status cancels the
    /// message's remaining timers. If the message is its chat's tail, the
    /// directory's last message is refreshed.
    pub fn update_message_status(
        &self,
        chat_id: &ChatId,
        message_id: &MessageId,
        status: MessageStatus,
    ) -> bool {
        let mut state = self.state.lock();
        let Some(messages) = state.messages.get_mut(chat_id) else {
            tracing::debug!(chat = %chat_id, %status, "status update for unloaded chat ignored");
            return false;
        };
        let Some(index) = messages.iter().position(|m| m.id == *message_id) else {
            tracing::debug!(chat = %chat_id, %message_id, %status, "status update for unknown message ignored");
            return false;
        };

        let message = &mut messages[index];
        match message.status.advance(status) {
            Ok(next) => message.status = next,
            Err(e) => {
                tracing::debug!(%message_id, error = %e, "stale status update rejected");
                return false;
            }
        }
        let tail = (index + 1 == messages.len()).then(|| messages[index].clone());

        if status.is_terminal() {
            state.timers.cancel(message_id);
        }
        if let Some(tail) = tail {
            self.directory.update_last_message(chat_id, tail);
        }
        drop(state);

        self.emit(LogEvent::StatusChanged {
            chat_id: chat_id.clone(),
            message_id: message_id.clone(),
            status,
        });
        true
    }

    /// Drops a chat's messages and cancels their pending timers.
    ///
    /// The chat is marked unloaded so the next fetch starts from scratch; a
    /// fetch already in flight for it is discarded when it resolves.
    pub fn clear_messages(&self, chat_id: &ChatId) {
        let mut state = self.state.lock();
        let removed = state.messages.remove(chat_id).unwrap_or_default();
        let cancelled: usize = removed
            .iter()
            .map(|m| state.timers.cancel(&m.id))
            .sum();
        state.loaded.remove(chat_id);
        state.loading.remove(chat_id);
        *state.generations.entry(chat_id.clone()).or_default() += 1;
        drop(state);

        tracing::debug!(
            chat = %chat_id,
            messages = removed.len(),
            cancelled,
            "chat messages cleared"
        );
        self.emit(LogEvent::Cleared {
            chat_id: chat_id.clone(),
        });
    }

    /// Cancels and forgets every pending timer for one message.
    pub fn clear_pending_timeouts(&self, message_id: &MessageId) {
        self.state.lock().timers.cancel(message_id);
    }

    /// Messages of a chat in order; empty if none are held.
    #[must_use]
    pub fn messages(&self, chat_id: &ChatId) -> Vec<Message> {
        self.state
            .lock()
            .messages
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }

    /// One message by id.
    #[must_use]
    pub fn message(&self, chat_id: &ChatId, message_id: &MessageId) -> Option<Message> {
        self.state
            .lock()
            .messages
            .get(chat_id)?
            .iter()
            .find(|m| m.id == *message_id)
            .cloned()
    }

    /// Whether a fetch for `chat_id` is in flight.
    #[must_use]
    pub fn is_loading(&self, chat_id: &ChatId) -> bool {
        self.state.lock().loading.contains(chat_id)
    }

    /// Whether `chat_id` has completed a fetch since it was last cleared.
    #[must_use]
    pub fn is_loaded(&self, chat_id: &ChatId) -> bool {
        self.state.lock().loaded.contains(chat_id)
    }

    /// Last fetch error. Shared by all chats.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// Status timers pending for one message.
    #[must_use]
    pub fn pending_timer_count(&self, message_id: &MessageId) -> usize {
        self.state.lock().timers.count(message_id)
    }

    /// Status timers pending across all messages.
    #[must_use]
    pub fn pending_timer_total(&self) -> usize {
        self.state.lock().timers.total()
    }
}
