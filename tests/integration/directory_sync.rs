//! Integration tests for keeping the chat directory in sync with the log.
//!
//! Checks directory ordering by the user's own latest message, unread
//! bookkeeping around selection, and last-message propagation.
//!
//! Verification command: `cargo test --test directory_sync`

use std::sync::Arc;
use std::time::Duration;

use parley::delay::FixedDelays;
use parley::directory::ChatDirectory;
use parley::log::MessageLog;
use parley::service::ScriptedService;
use parley_proto::{Chat, ChatId, Message, MessageId, MessageStatus, Timestamp, UserId};

// =============================================================================
// Test helpers
// =============================================================================

fn message(chat: &str, sender: UserId, ts: u64) -> Message {
    Message {
        id: MessageId::new(),
        chat_id: ChatId::new(chat),
        text: format!("{sender} at {ts}"),
        sender_id: sender,
        timestamp: Timestamp::from_millis(ts),
        status: MessageStatus::Delivered,
    }
}

fn chat(id: &str, last: Option<Message>) -> Chat {
    Chat {
        id: ChatId::new(id),
        name: id.to_uppercase(),
        avatar: String::new(),
        last_message: last,
        unread_count: 0,
        last_own_message_at: Timestamp::ZERO,
    }
}

type Directory = Arc<ChatDirectory<ScriptedService>>;
type Log = Arc<MessageLog<ScriptedService>>;

async fn setup(chats: Vec<Chat>) -> (Arc<ScriptedService>, Directory, Log) {
    let service = Arc::new(ScriptedService::new(Duration::from_millis(20)).with_chats(chats));
    let directory = Arc::new(ChatDirectory::new(Arc::clone(&service)));
    directory.fetch_directory().await;
    let delays = Arc::new(FixedDelays {
        delivered: Duration::from_millis(500),
        read: Duration::from_millis(1500),
    });
    let (log, _events) = MessageLog::new(Arc::clone(&service), directory.clone(), delays, 64);
    (service, directory, log)
}

fn order(directory: &Directory) -> Vec<String> {
    directory
        .chats()
        .into_iter()
        .map(|c| c.id.as_str().to_string())
        .collect()
}

fn unread(directory: &Directory, id: &str) -> u32 {
    directory.chat(&ChatId::new(id)).unwrap().unread_count
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test(start_paused = true)]
async fn fetched_directory_is_ordered_by_own_last_message() {
    let peer = UserId::new("user-1");
    let chats = vec![
        chat("peer-newest", Some(message("peer-newest", peer.clone(), 900))),
        chat("own-old", Some(message("own-old", UserId::current(), 100))),
        chat("empty", None),
        chat("own-new", Some(message("own-new", UserId::current(), 500))),
    ];
    let (_service, directory, _log) = setup(chats).await;

    assert_eq!(order(&directory), ["own-new", "own-old", "peer-newest", "empty"]);
    let own_new = directory.chat(&ChatId::new("own-new")).unwrap();
    assert_eq!(own_new.last_own_message_at, Timestamp::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn sending_moves_chat_to_the_top() {
    let chats = vec![
        chat("b", Some(message("b", UserId::current(), 300))),
        chat("c", Some(message("c", UserId::current(), 200))),
        chat("a", Some(message("a", UserId::current(), 100))),
    ];
    let (_service, directory, log) = setup(chats).await;
    assert_eq!(order(&directory), ["b", "c", "a"]);

    log.send_message(&ChatId::new("a"), "hi");
    assert_eq!(order(&directory), ["a", "b", "c"]);

    log.send_message(&ChatId::new("c"), "hi");
    assert_eq!(order(&directory), ["c", "a", "b"]);
}

#[tokio::test(start_paused = true)]
async fn peer_messages_do_not_reorder() {
    let chats = vec![
        chat("a", Some(message("a", UserId::current(), 300))),
        chat("b", Some(message("b", UserId::current(), 200))),
    ];
    let (_service, directory, log) = setup(chats).await;

    log.add_message(message("b", UserId::new("user-2"), u64::MAX / 2));

    assert_eq!(order(&directory), ["a", "b"]);
    let last = directory.chat(&ChatId::new("b")).unwrap().last_message.unwrap();
    assert_eq!(last.timestamp, Timestamp::from_millis(u64::MAX / 2));
}

#[tokio::test(start_paused = true)]
async fn older_own_message_does_not_lower_sort_key() {
    let chats = vec![chat("a", Some(message("a", UserId::current(), 500)))];
    let (_service, directory, log) = setup(chats).await;

    log.add_message(message("a", UserId::current(), 100));

    let a = directory.chat(&ChatId::new("a")).unwrap();
    assert_eq!(a.last_own_message_at, Timestamp::from_millis(500));
    assert_eq!(a.last_message.unwrap().timestamp, Timestamp::from_millis(100));
}

// =============================================================================
// Unread counts
// =============================================================================

#[tokio::test(start_paused = true)]
async fn unread_counts_only_peer_messages_outside_selection() {
    let (_service, directory, log) = setup(vec![chat("a", None), chat("b", None)]).await;
    let peer = UserId::new("user-1");

    log.add_message(message("a", peer.clone(), 1));
    log.add_message(message("a", peer.clone(), 2));
    log.add_message(message("a", UserId::current(), 3));
    assert_eq!(unread(&directory, "a"), 2);

    directory.select_chat(&ChatId::new("a"));
    assert_eq!(unread(&directory, "a"), 0);

    log.add_message(message("a", peer.clone(), 4));
    log.add_message(message("b", peer, 5));
    assert_eq!(unread(&directory, "a"), 0);
    assert_eq!(unread(&directory, "b"), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_unread_count_leaves_selection_alone() {
    let (_service, directory, log) = setup(vec![chat("a", None)]).await;

    log.add_message(message("a", UserId::new("user-1"), 1));
    directory.reset_unread_count(&ChatId::new("a"));

    assert_eq!(unread(&directory, "a"), 0);
    assert!(directory.selected_chat_id().is_none());
}

#[tokio::test(start_paused = true)]
async fn messages_for_unknown_chats_are_held_but_not_listed() {
    let (_service, directory, log) = setup(vec![chat("a", None)]).await;
    let ghost = ChatId::new("ghost");

    log.add_message(message("ghost", UserId::new("user-1"), 1));

    assert_eq!(log.messages(&ghost).len(), 1);
    assert!(directory.chat(&ghost).is_none());
    assert_eq!(directory.chats().len(), 1);
}

// =============================================================================
// Directory fetch
// =============================================================================

#[tokio::test(start_paused = true)]
async fn failed_directory_fetch_keeps_previous_chats() {
    let (service, directory, _log) = setup(vec![chat("a", None)]).await;
    service.fail_list_chats(true);

    directory.fetch_directory().await;

    assert_eq!(
        directory.error().as_deref(),
        Some("service unavailable: chat directory offline")
    );
    assert!(!directory.is_loading());
    assert_eq!(order(&directory), ["a"]);

    service.fail_list_chats(false);
    directory.fetch_directory().await;
    assert!(directory.error().is_none());
    assert_eq!(service.list_chats_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn selection_survives_refetch() {
    let (_service, directory, _log) = setup(vec![chat("a", None), chat("b", None)]).await;
    directory.select_chat(&ChatId::new("b"));

    directory.fetch_directory().await;

    assert_eq!(directory.selected_chat().unwrap().id, ChatId::new("b"));
}
