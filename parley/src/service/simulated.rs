//! Simulated chat backend with randomized latency.
//!
//! Users and chats are generated once at construction. A chat's history is
//! generated the first time it is requested and cached afterwards, so
//! repeated fetches (for example after a clear) see the same messages.
//! Sends are acknowledged but not recorded: the server copy would carry its
//! own id and show up next to the client's optimistic one.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use parley_proto::{Chat, ChatId, Message, MessageId, MessageStatus, Timestamp, User, UserId};

use super::mock_data::{generate_chats, generate_history, generate_users};
use super::{ChatService, ServiceError};

/// Tuning for [`SimulatedService`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Lower bound of the simulated round trip.
    pub latency_min: Duration,
    /// Upper bound of the simulated round trip.
    pub latency_max: Duration,
    /// Probability in `0.0..=1.0` that a request fails.
    pub failure_rate: f64,
    /// Number of generated peers (one chat each).
    pub chat_count: usize,
    /// Base number of historical messages per chat.
    pub messages_per_chat: usize,
    /// Random extra messages per chat, `0..messages_jitter`.
    pub messages_jitter: usize,
    /// Seed for reproducible data; random when `None`.
    pub seed: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            latency_min: Duration::from_millis(300),
            latency_max: Duration::from_millis(800),
            failure_rate: 0.0,
            chat_count: 15,
            messages_per_chat: 5000,
            messages_jitter: 500,
            seed: None,
        }
    }
}

/// In-process stand-in for a chat server.
pub struct SimulatedService {
    config: ServiceConfig,
    users: Vec<User>,
    chats: Vec<Chat>,
    histories: Mutex<HashMap<ChatId, Vec<Message>>>,
    rng: Mutex<StdRng>,
}

impl SimulatedService {
    /// Generates the user and chat directory from `config`.
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        let mut rng = config
            .seed
            .map_or_else(|| StdRng::from_rng(&mut rand::rng()), StdRng::seed_from_u64);
        let users = generate_users(&mut rng, config.chat_count);
        let chats = generate_chats(&mut rng, &users, Timestamp::now());
        tracing::debug!(
            users = users.len(),
            seeded = config.seed.is_some(),
            "generated simulated directory"
        );
        Self {
            config,
            users,
            chats,
            histories: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    /// Peers known to the service; the incoming feed picks senders from here.
    #[must_use]
    pub fn users(&self) -> &[User] {
        &self.users
    }

    fn latency(&self) -> Duration {
        let min = self.config.latency_min;
        let max = self.config.latency_max.max(min);
        self.rng.lock().random_range(min..=max)
    }

    fn should_fail(&self) -> bool {
        let rate = self.config.failure_rate.clamp(0.0, 1.0);
        rate > 0.0 && self.rng.lock().random_bool(rate)
    }

    /// Waits out the simulated round trip, then rolls for failure.
    async fn round_trip(&self, operation: &'static str) -> Result<(), ServiceError> {
        tokio::time::sleep(self.latency()).await;
        if self.should_fail() {
            tracing::debug!(operation, "simulated request failure");
            return Err(ServiceError::Unavailable(format!(
                "simulated network error during {operation}"
            )));
        }
        Ok(())
    }

    fn find_chat(&self, chat_id: &ChatId) -> Result<&Chat, ServiceError> {
        self.chats
            .iter()
            .find(|c| c.id == *chat_id)
            .ok_or_else(|| ServiceError::UnknownChat(chat_id.clone()))
    }
}

impl ChatService for SimulatedService {
    async fn list_chats(&self) -> Result<Vec<Chat>, ServiceError> {
        self.round_trip("list_chats").await?;
        let mut chats = self.chats.clone();
        chats.sort_by(|a, b| {
            let key = |c: &Chat| c.last_message.as_ref().map_or(Timestamp::ZERO, |m| m.timestamp);
            key(b).cmp(&key(a))
        });
        Ok(chats)
    }

    async fn list_messages(&self, chat_id: &ChatId) -> Result<Vec<Message>, ServiceError> {
        self.round_trip("list_messages").await?;
        let chat = self.find_chat(chat_id)?;

        let mut histories = self.histories.lock();
        let history = histories.entry(chat_id.clone()).or_insert_with(|| {
            let mut rng = self.rng.lock();
            let jitter = rng.random_range(0..self.config.messages_jitter.max(1));
            generate_history(&mut *rng, chat, self.config.messages_per_chat + jitter)
        });
        Ok(history.clone())
    }

    async fn send_message(&self, chat_id: &ChatId, text: &str) -> Result<Message, ServiceError> {
        self.round_trip("send_message").await?;
        self.find_chat(chat_id)?;

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
