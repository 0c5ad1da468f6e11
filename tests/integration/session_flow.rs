//! End-to-end tests for the session layer.
//!
//! Exercises load, select, send, incoming delivery and retry through
//! `Session`, using both the scripted and the simulated service.
//!
//! Verification command: `cargo test --test session_flow`

use std::sync::Arc;
use std::time::Duration;

use parley::delay::FixedDelays;
use parley::log::LogEvent;
use parley::service::{
    IncomingConfig, IncomingFeed, ScriptedService, ServiceConfig, SimulatedService,
};
use parley::session::Session;
use parley_proto::{Chat, ChatId, Message, MessageId, MessageStatus, Timestamp, User, UserId};

// =============================================================================
// Test helpers
// =============================================================================

fn delays() -> Arc<FixedDelays> {
    Arc::new(FixedDelays {
        delivered: Duration::from_millis(500),
        read: Duration::from_millis(1500),
    })
}

fn chat(id: &str) -> Chat {
    Chat {
        id: ChatId::new(id),
        name: format!("Peer {id}"),
        avatar: String::new(),
        last_message: None,
        unread_count: 0,
        last_own_message_at: Timestamp::ZERO,
    }
}

fn peer(id: &str) -> User {
    User {
        id: UserId::new(id),
        name: format!("Peer {id}"),
        avatar: String::new(),
        is_online: Some(true),
    }
}

fn from_peer(chat: &str, text: &str, ts: u64) -> Message {
    Message {
        id: MessageId::new(),
        chat_id: ChatId::new(chat),
        text: text.to_string(),
        sender_id: UserId::new(chat),
        timestamp: Timestamp::from_millis(ts),
        status: MessageStatus::Delivered,
    }
}

/// Incoming feed whose own loop stays quiet for the length of a test.
fn quiet_feed(peers: Vec<User>) -> IncomingFeed {
    IncomingFeed::new(
        peers,
        IncomingConfig {
            interval_min: Duration::from_secs(3600),
            interval_max: Duration::from_secs(3600),
        },
    )
}

// =============================================================================
// Scripted service
// =============================================================================

#[tokio::test(start_paused = true)]
async fn open_chat_and_send() {
    let service = ScriptedService::new(Duration::from_millis(100))
        .with_chats(vec![chat("a"), chat("b")])
        .with_history(ChatId::new("b"), vec![from_peer("b", "hello?", 1)]);
    let (session, _events) = Session::new(Arc::new(service), delays(), 64);
    let b = ChatId::new("b");

    session.load().await;
    assert_eq!(session.chats_view().chats.len(), 2);

    session.select_chat(&b).await;
    let view = session.messages_view(None);
    assert_eq!(view.chat_id.as_ref(), Some(&b));
    assert_eq!(view.messages.len(), 1);

    let id = session.send("hi back").unwrap();
    let chats = session.chats_view();
    assert_eq!(chats.chats[0].id, b);
    assert_eq!(chats.selected_chat.unwrap().id, b);

    tokio::time::sleep(Duration::from_secs(3)).await;
    let sent = session.log().message(&b, &id).unwrap();
    assert_eq!(sent.status, MessageStatus::Read);
    assert_eq!(session.messages_view(None).messages.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_recovers_from_failed_loads() {
    let service = Arc::new(
        ScriptedService::new(Duration::from_millis(10))
            .with_chats(vec![chat("a")])
            .with_history(ChatId::new("a"), vec![from_peer("a", "hey", 1)]),
    );
    let (session, _events) = Session::new(Arc::clone(&service), delays(), 64);
    let a = ChatId::new("a");

    service.fail_list_chats(true);
    session.load().await;
    assert!(session.chats_view().error.is_some());
    assert!(session.chats_view().chats.is_empty());

    service.fail_list_chats(false);
    session.retry().await;
    assert!(session.chats_view().error.is_none());

    service.fail_list_messages(true);
    session.select_chat(&a).await;
    assert!(session.messages_view(None).error.is_some());

    service.fail_list_messages(false);
    session.retry().await;
    let view = session.messages_view(None);
    assert!(view.error.is_none());
    assert_eq!(view.messages.len(), 1);
    assert_eq!(service.list_messages_calls(&a), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_without_failures_does_nothing() {
    let service = Arc::new(ScriptedService::new(Duration::from_millis(10)).with_chats(vec![chat("a")]));
    let (session, _events) = Session::new(Arc::clone(&service), delays(), 64);

    session.load().await;
    session.retry().await;

    assert_eq!(service.list_chats_calls(), 1);
}

// =============================================================================
// Incoming feed
// =============================================================================

#[tokio::test(start_paused = true)]
async fn incoming_messages_reach_log_and_directory() {
    let service = ScriptedService::new(Duration::from_millis(10))
        .with_chats(vec![chat("user-1"), chat("user-2")]);
    let (session, mut events) = Session::new(Arc::new(service), delays(), 64);
    let session = session.with_incoming(quiet_feed(vec![peer("user-1"), peer("user-2")]));
    session.load().await;
    session.select_chat(&ChatId::new("user-2")).await;
    while events.try_recv().is_ok() {}

    assert!(session.connect_incoming());
    assert!(session.is_incoming_connected());
    let feed = session.feed().unwrap();
    assert_eq!(feed.emit(&from_peer("user-1", "ping", 10)), 1);
    assert_eq!(feed.emit(&from_peer("user-2", "pong", 11)), 1);
    tokio::time::sleep(Duration::from_millis(1)).await;

    let user1 = ChatId::new("user-1");
    let user2 = ChatId::new("user-2");
    assert_eq!(session.log().messages(&user1).len(), 1);
    assert_eq!(session.messages_view(None).messages.len(), 1);

    let chats = session.chats_view();
    let unread = |id: &ChatId| {
        chats
            .chats
            .iter()
            .find(|c| c.id == *id)
            .map(|c| c.unread_count)
    };
    assert_eq!(unread(&user1), Some(1));
    assert_eq!(unread(&user2), Some(0));

    let added: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e, LogEvent::MessageAdded { .. }))
        .collect();
    assert_eq!(added.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn disconnect_stops_the_feed() {
    let (session, _events) = Session::new(Arc::new(ScriptedService::default()), delays(), 8);
    let session = session.with_incoming(quiet_feed(vec![peer("user-1")]));

    session.connect_incoming();
    session.connect_incoming();
    assert!(session.is_incoming_connected());

    session.disconnect_incoming();
    assert!(!session.is_incoming_connected());
}

#[tokio::test(start_paused = true)]
async fn feed_loop_delivers_on_its_own() {
    let service = ScriptedService::new(Duration::from_millis(10)).with_chats(vec![chat("user-1")]);
    let (session, _events) = Session::new(Arc::new(service), delays(), 64);
    let feed = IncomingFeed::new(
        vec![peer("user-1")],
        IncomingConfig {
            interval_min: Duration::from_millis(100),
            interval_max: Duration::from_millis(200),
        },
    );
    let session = session.with_incoming(feed);
    session.load().await;

    session.connect_incoming();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    session.disconnect_incoming();

    let received = session.log().messages(&ChatId::new("user-1")).len();
    assert!((4..=10).contains(&received), "received {received}");
    let chat = session.directory().chat(&ChatId::new("user-1")).unwrap();
    assert_eq!(chat.unread_count, u32::try_from(received).unwrap());
}

// =============================================================================
// Simulated service
// =============================================================================

#[tokio::test(start_paused = true)]
async fn simulated_service_end_to_end() {
    let config = ServiceConfig {
        chat_count: 4,
        messages_per_chat: 30,
        messages_jitter: 5,
        seed: Some(11),
        ..ServiceConfig::default()
    };
    let service = Arc::new(SimulatedService::new(config));
    let (session, _events) = Session::new(service, delays(), 64);

    session.load().await;
    let chats = session.chats_view().chats;
    assert_eq!(chats.len(), 4);
    let first = chats[0].id.clone();

    session.select_chat(&first).await;
    let view = session.messages_view(None);
    assert!(view.messages.len() >= 30);
    assert!(
        view.messages
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    );

    let id = session.send("hello from the test").unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(
        session.log().message(&first, &id).unwrap().status,
        MessageStatus::Read
    );
}

#[tokio::test(start_paused = true)]
async fn views_serialize_to_camel_case_json() {
    let service = ScriptedService::new(Duration::from_millis(10)).with_chats(vec![chat("a")]);
    let (session, _events) = Session::new(Arc::new(service), delays(), 64);
    session.load().await;
    session.select_chat(&ChatId::new("a")).await;

    let chats = serde_json::to_value(session.chats_view()).unwrap();
    assert_eq!(chats["selectedChat"]["id"], "a");
    assert_eq!(chats["isLoading"], false);

    let messages = serde_json::to_value(session.messages_view(None)).unwrap();
    assert_eq!(messages["chatId"], "a");
    assert!(messages["messages"].as_array().unwrap().is_empty());
}
