//! Bookkeeping for delayed status transitions.

use std::collections::HashMap;

use tokio::task::AbortHandle;

use parley_proto::{MessageId, MessageStatus};

/// Outstanding status timers, keyed by message id.
///
/// A message's entry disappears once its last timer completes or is
/// cancelled. Dropping the set aborts everything still pending.
#[derive(Default)]
pub struct PendingTimers {
    by_message: HashMap<MessageId, Vec<(MessageStatus, AbortHandle)>>,
}

impl PendingTimers {
    /// Records a timer that will move `message_id` to `target`.
    pub fn track(&mut self, message_id: MessageId, target: MessageStatus, handle: AbortHandle) {
        self.by_message
            .entry(message_id)
            .or_default()
            .push((target, handle));
    }

    /// Forgets the timer for `target` after it fired.
    pub fn complete(&mut self, message_id: &MessageId, target: MessageStatus) {
        let Some(timers) = self.by_message.get_mut(message_id) else {
            return;
        };
        timers.retain(|(t, _)| *t != target);
        if timers.is_empty() {
            self.by_message.remove(message_id);
        }
    }

    /// Aborts and forgets every timer for `message_id`.
    ///
    /// Returns how many were cancelled; zero when there were none.
    pub fn cancel(&mut self, message_id: &MessageId) -> usize {
        self.by_message.remove(message_id).map_or(0, |timers| {
            for (_, handle) in &timers {
                handle.abort();
            }
            timers.len()
        })
    }

    /// Timers still pending for `message_id`.
    #[must_use]
    pub fn count(&self, message_id: &MessageId) -> usize {
        self.by_message.get(message_id).map_or(0, Vec::len)
    }

    /// Timers still pending across all messages.
    #[must_use]
    pub fn total(&self) -> usize {
        self.by_message.values().map(Vec::len).sum()
    }
}

impl Drop for PendingTimers {
    fn drop(&mut self) {
        for (_, handle) in self.by_message.values().flatten() {
            handle.abort();
        }
    }
}
