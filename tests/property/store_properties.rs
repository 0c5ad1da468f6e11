//! Property-based tests for the store invariants.
//!
//! Uses proptest to verify:
//! 1. The fetch merge keeps every id exactly once, prefers fetched content
//!    and orders by timestamp.
//! 2. Directory order after any sequence of last-message updates equals a
//!    stable descending sort by the user's own latest message.
//! 3. Unread counts equal the number of peer messages added while the chat
//!    was not selected.
//! 4. Message status never moves backwards or leaves a terminal state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use uuid::Uuid;

use parley::delay::FixedDelays;
use parley::directory::{ChatDirectory, DirectorySink};
use parley::log::MessageLog;
use parley::log::merge::merge_fetched;
use parley::service::ScriptedService;
use parley_proto::{Chat, ChatId, Message, MessageId, MessageStatus, Timestamp, UserId};

// --- Strategies and helpers ---

fn message(id: u128, chat: usize, own: bool, ts: u64, text: &str) -> Message {
    Message {
        id: MessageId::from_uuid(Uuid::from_u128(id)),
        chat_id: chat_id(chat),
        text: text.to_string(),
        sender_id: if own {
            UserId::current()
        } else {
            UserId::new("user-1")
        },
        timestamp: Timestamp::from_millis(ts),
        status: MessageStatus::Delivered,
    }
}

fn chat_id(index: usize) -> ChatId {
    ChatId::new(format!("chat-{index}"))
}

fn chat(index: usize, last: Option<Message>) -> Chat {
    Chat {
        id: chat_id(index),
        name: format!("Chat {index}"),
        avatar: String::new(),
        last_message: last,
        unread_count: 0,
        last_own_message_at: Timestamp::ZERO,
    }
}

/// `(id, timestamp)` pairs drawn from small ranges so ids and timestamps
/// collide often.
fn arb_entries(max: usize) -> impl Strategy<Value = Vec<(u128, u64)>> {
    prop::collection::vec((0u128..24, 0u64..8), 0..max)
}

fn arb_status() -> impl Strategy<Value = MessageStatus> {
    prop_oneof![
        Just(MessageStatus::Sending),
        Just(MessageStatus::Sent),
        Just(MessageStatus::Delivered),
        Just(MessageStatus::Read),
        Just(MessageStatus::Failed),
    ]
}

const fn happy_rank(status: MessageStatus) -> u8 {
    match status {
        MessageStatus::Sending => 0,
        MessageStatus::Sent => 1,
        MessageStatus::Delivered => 2,
        MessageStatus::Read => 3,
        MessageStatus::Failed => 4,
    }
}

/// Directory loaded with `chats` through a zero-latency service.
fn loaded_directory(chats: Vec<Chat>) -> Arc<ChatDirectory<ScriptedService>> {
    let service = Arc::new(ScriptedService::new(Duration::ZERO).with_chats(chats));
    let directory = Arc::new(ChatDirectory::new(service));
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(directory.fetch_directory());
    directory
}

fn ids(chats: &[Chat]) -> Vec<ChatId> {
    chats.iter().map(|c| c.id.clone()).collect()
}

// --- Merge ---

proptest! {
    #[test]
    fn merge_keeps_each_id_once_sorted(
        fetched in arb_entries(16),
        local in arb_entries(16),
    ) {
        let fetched: Vec<Message> = fetched
            .into_iter()
            .map(|(id, ts)| message(id, 0, false, ts, "fetched"))
            .collect();
        let local: Vec<Message> = local
            .into_iter()
            .map(|(id, ts)| message(id, 0, true, ts, "local"))
            .collect();

        let merged = merge_fetched(fetched.clone(), &local);

        let merged_ids: Vec<&MessageId> = merged.iter().map(|m| &m.id).collect();
        let unique: HashSet<&MessageId> = merged_ids.iter().copied().collect();
        prop_assert_eq!(unique.len(), merged_ids.len());

        let expected: HashSet<&MessageId> =
            fetched.iter().chain(&local).map(|m| &m.id).collect();
        prop_assert_eq!(unique, expected);

        prop_assert!(merged.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let fetched_ids: HashSet<&MessageId> = fetched.iter().map(|m| &m.id).collect();
        for m in &merged {
            if fetched_ids.contains(&m.id) {
                prop_assert_eq!(m.text.as_str(), "fetched");
            }
        }
    }

    #[test]
    fn merge_of_local_only_is_a_stable_sort(local in arb_entries(24)) {
        let mut seen = HashSet::new();
        let local: Vec<Message> = local
            .into_iter()
            .filter(|(id, _)| seen.insert(*id))
            .map(|(id, ts)| message(id, 0, true, ts, "local"))
            .collect();

        let merged = merge_fetched(Vec::new(), &local);

        let mut expected = local.clone();
        expected.sort_by_key(|m| m.timestamp);
        prop_assert_eq!(merged, expected);
    }
}

// --- Directory order ---

proptest! {
    #[test]
    fn directory_order_matches_stable_sort(
        initial in prop::collection::vec(prop::option::of((any::<bool>(), 0u64..20)), 1..8),
        updates in prop::collection::vec((0usize..8, any::<bool>(), 0u64..40), 0..24),
    ) {
        let count = initial.len();
        let chats: Vec<Chat> = initial
            .iter()
            .enumerate()
            .map(|(i, last)| {
                let last = last.map(|(own, ts)| message(i as u128, i, own, ts, "seed"));
                chat(i, last)
            })
            .collect();
        let directory = loaded_directory(chats);

        for (n, (target, own, ts)) in updates.into_iter().enumerate() {
            let target = target % count;
            let before = directory.chats();
            let msg = message(1000 + n as u128, target, own, ts, "update");

            let mut model = before.clone();
            let entry = model.iter_mut().find(|c| c.id == chat_id(target)).unwrap();
            if own {
                entry.last_own_message_at = entry.last_own_message_at.max(msg.timestamp);
            }
            model.sort_by(|a, b| b.last_own_message_at.cmp(&a.last_own_message_at));

            directory.update_last_message(&chat_id(target), msg.clone());
            let after = directory.chats();

            prop_assert_eq!(ids(&after), ids(&model));
            let updated = after.iter().find(|c| c.id == chat_id(target)).unwrap();
            prop_assert_eq!(updated.last_message.as_ref(), Some(&msg));
        }
    }
}

// --- Unread bookkeeping ---

#[derive(Debug, Clone)]
enum Op {
    Add { chat: usize, own: bool },
    Select(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..4, any::<bool>()).prop_map(|(chat, own)| Op::Add { chat, own }),
        1 => (0usize..4).prop_map(Op::Select),
    ]
}

proptest! {
    #[test]
    fn unread_counts_match_model(ops in prop::collection::vec(arb_op(), 0..40)) {
        let directory = loaded_directory((0..4).map(|i| chat(i, None)).collect());
        let delays = Arc::new(FixedDelays {
            delivered: Duration::from_millis(1),
            read: Duration::from_millis(2),
        });
        let service = Arc::new(ScriptedService::default());
        let (log, _events) = MessageLog::new(service, directory.clone(), delays, 1);

        let mut selected: Option<usize> = None;
        let mut expected: HashMap<usize, u32> = HashMap::new();
        let mut last: HashMap<usize, MessageId> = HashMap::new();

        for (n, op) in ops.into_iter().enumerate() {
            match op {
                Op::Add { chat, own } => {
                    let msg = message(n as u128, chat, own, n as u64, "m");
                    last.insert(chat, msg.id.clone());
                    log.add_message(msg);
                    if !own && selected != Some(chat) {
                        *expected.entry(chat).or_default() += 1;
                    }
                }
                Op::Select(chat) => {
                    directory.select_chat(&chat_id(chat));
                    selected = Some(chat);
                    expected.insert(chat, 0);
                }
            }
        }

        for i in 0..4 {
            let listed = directory.chat(&chat_id(i)).unwrap();
            prop_assert_eq!(listed.unread_count, expected.get(&i).copied().unwrap_or(0));
            prop_assert_eq!(
                listed.last_message.map(|m| m.id),
                last.get(&i).cloned()
            );
        }
    }
}

// --- Status transitions ---

proptest! {
    #[test]
    fn status_never_regresses(steps in prop::collection::vec(arb_status(), 0..20)) {
        let mut status = MessageStatus::Sending;
        for next in steps {
            let before = status;
            if let Ok(advanced) = status.advance(next) {
                prop_assert!(!before.is_terminal());
                prop_assert!(happy_rank(advanced) > happy_rank(before));
                status = advanced;
            } else {
                prop_assert!(before.is_terminal() || happy_rank(next) <= happy_rank(before));
            }
        }
    }
}
