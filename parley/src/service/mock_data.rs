//! Generated users, chats and histories for the simulated service.

use rand::Rng;
use rand::seq::IndexedRandom;

use parley_proto::{Chat, ChatId, Message, MessageId, MessageStatus, Timestamp, User, UserId};

const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Sample bodies for generated history.
pub const SAMPLE_MESSAGES: &[&str] = &[
    "Hey, how's it going?",
    "Did you see the new update?",
    "That sounds great!",
    "I'll check it out later",
    "Thanks for letting me know",
    "Can we schedule a call?",
    "Perfect, that works for me",
    "Let me think about it",
    "Sure, I can do that",
    "What time works for you?",
    "Just finished the task",
    "The meeting went well",
    "Can you send me the file?",
    "I'll be there in 10 minutes",
    "Let's grab lunch tomorrow",
    "Have you heard back yet?",
    "That's hilarious \u{1f602}",
    "Congrats on the promotion!",
    "Happy birthday! \u{1f389}",
    "See you soon!",
    "Working on it now",
    "Almost done with the project",
    "Need more time for this",
    "Can you review my PR?",
    "LGTM! \u{1f44d}",
    "Let's discuss this tomorrow",
    "Good morning!",
    "Good night! \u{1f319}",
    "On my way",
    "Running a bit late",
    "Just saw your message",
    "That makes sense",
    "I agree with you",
    "Not sure about that",
    "Let me check and get back to you",
    "Thanks for your help!",
    "No problem at all",
    "Sounds like a plan",
    "Count me in!",
    "I'll pass on this one",
    "Can you explain more?",
    "Got it, thanks!",
    "Will do!",
    "Already on it",
    "Just a heads up",
    "FYI",
    "Quick question",
    "Any updates?",
    "All good here",
    "Take your time",
];

const FIRST_NAMES: &[&str] = &[
    "Alex", "Jordan", "Taylor", "Morgan", "Casey", "Riley", "Quinn", "Avery", "Charlie", "Drew",
    "Emery", "Finley", "Harper", "Jamie", "Kendall", "Logan", "Madison", "Peyton", "Reese",
    "Skyler",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Anderson", "Taylor", "Thomas", "Moore", "Jackson",
];

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// Picks a random sample body.
pub fn sample_text<R: Rng + ?Sized>(rng: &mut R) -> String {
    pick(rng, SAMPLE_MESSAGES).to_string()
}

/// Generates `count` peers with ids `user-1..=user-count`.
pub fn generate_users<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<User> {
    (1..=count)
        .map(|index| {
            let id = format!("user-{index}");
            User {
                name: format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES)),
                avatar: format!("avatar://identicon/{id}"),
                is_online: Some(rng.random_bool(0.5)),
                id: UserId::new(id),
            }
        })
        .collect()
}

/// One direct chat per user, keyed by the user's id, with a last message
/// from either side somewhere in the past week.
pub fn generate_chats<R: Rng + ?Sized>(rng: &mut R, users: &[User], now: Timestamp) -> Vec<Chat> {
    users
        .iter()
        .map(|user| {
            let chat_id = ChatId::new(user.id.as_str());
            let age = rng.random_range(0..7 * MS_PER_DAY);
            let sender_id = if rng.random_bool(0.5) {
                UserId::current()
            } else {
                user.id.clone()
            };
            let last_message = Message {
                id: MessageId::new(),
                chat_id: chat_id.clone(),
                text: sample_text(rng),
                sender_id,
                timestamp: Timestamp::from_millis(now.as_millis().saturating_sub(age)),
                status: MessageStatus::Read,
            };
            Chat {
                id: chat_id,
                name: user.name.clone(),
                avatar: user.avatar.clone(),
                last_message: Some(last_message),
                unread_count: rng.random_range(0..5),
                last_own_message_at: Timestamp::ZERO,
            }
        })
        .collect()
}

/// History for `chat`: `count` messages spread evenly over the 30 days
/// before its last message, ending with that last message so the summary
/// and the history agree.
pub fn generate_history<R: Rng + ?Sized>(rng: &mut R, chat: &Chat, count: usize) -> Vec<Message> {
    let peer = UserId::new(chat.id.as_str());
    let end = chat
        .last_message
        .as_ref()
        .map_or_else(Timestamp::now, |m| m.timestamp)
        .as_millis();
    let start = end.saturating_sub(30 * MS_PER_DAY);
    let span = end - start;
    let steps = u64::try_from(count).unwrap_or(u64::MAX).max(1);

    let mut history: Vec<Message> = (0..steps.min(u64::try_from(count).unwrap_or(0)))
        .map(|i| Message {
            id: MessageId::new(),
            chat_id: chat.id.clone(),
            text: sample_text(rng),
            sender_id: if rng.random_bool(0.5) {
                UserId::current()
            } else {
                peer.clone()
            },
            timestamp: Timestamp::from_millis(start + span * i / steps),
            status: MessageStatus::Read,
        })
        .collect();

    if let Some(last) = &chat.last_message {
        history.push(last.clone());
    }
    history
}
