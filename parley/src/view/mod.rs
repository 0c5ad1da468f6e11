//! Plain-text rendering of chats and messages for the line-based client.

pub mod format;

use parley_proto::{Chat, Message};

pub use format::{format_full_time, format_message_time, truncate_text};

/// One chat-list row: index, name, unread badge, time and preview.
///
/// The selected chat is marked with `>`.
#[must_use]
pub fn chat_line(index: usize, chat: &Chat, selected: bool, preview_len: usize) -> String {
    let marker = if selected { '>' } else { ' ' };
    let badge = if chat.unread_count > 0 {
        format!(" ({})", chat.unread_count)
    } else {
        String::new()
    };
    let (time, preview) = chat.last_message.as_ref().map_or_else(
        || (String::new(), String::new()),
        |m| {
            let prefix = if m.is_own() { "You: " } else { "" };
            (
                format_message_time(m.timestamp),
                format!("{prefix}{}", truncate_text(&m.text, preview_len)),
            )
        },
    );
    format!("{marker}{index:>3}. {}{badge}  {time}  {preview}", chat.name)
}

/// One transcript row. Own messages carry their status symbol.
#[must_use]
pub fn message_line(message: &Message, peer_name: &str) -> String {
    let time = format_message_time(message.timestamp);
    if message.is_own() {
        format!("[{time}] You: {} {}", message.text, message.status.symbol())
    } else {
        format!("[{time}] {peer_name}: {}", message.text)
    }
}
