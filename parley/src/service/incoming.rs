//! Simulated push channel delivering messages from peers.
//!
//! While connected, [`IncomingFeed`] emits a message from a random known
//! peer after each randomized interval. Subscribers receive messages on a
//! bounded channel; a subscriber whose receiver was dropped is pruned on
//! the next emission.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use parley_proto::{ChatId, Message, MessageId, MessageStatus, Timestamp, User};

const SAMPLE_INCOMING: &[&str] = &[
    "Hey, are you there?",
    "Just wanted to check in",
    "Got a minute to chat?",
    "Quick update for you",
    "FYI - meeting moved to 3pm",
    "Thanks for your help earlier!",
    "Did you see my email?",
    "Let me know when you're free",
    "Coffee later? \u{2615}",
    "Great work on the project!",
    "Can we sync tomorrow?",
    "Just finished the review",
    "Looks good to me \u{1f44d}",
    "One small change needed",
    "All done on my end",
];

/// Timing for [`IncomingFeed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingConfig {
    /// Shortest gap between two incoming messages.
    pub interval_min: Duration,
    /// Longest gap between two incoming messages.
    pub interval_max: Duration,
}

impl Default for IncomingConfig {
    fn default() -> Self {
        Self {
            interval_min: Duration::from_secs(3),
            interval_max: Duration::from_secs(7),
        }
    }
}

#[derive(Default)]
struct FeedState {
    subscribers: Vec<mpsc::Sender<Message>>,
    task: Option<JoinHandle<()>>,
}

/// Randomly timed source of incoming messages.
pub struct IncomingFeed {
    peers: Arc<[User]>,
    config: IncomingConfig,
    state: Arc<Mutex<FeedState>>,
}

impl IncomingFeed {
    /// Creates a disconnected feed that will speak for `peers`.
    #[must_use]
    pub fn new(peers: Vec<User>, config: IncomingConfig) -> Self {
        Self {
            peers: peers.into(),
            config,
            state: Arc::new(Mutex::new(FeedState::default())),
        }
    }

    /// Registers a subscriber. Dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self, buffer: usize) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.state.lock().subscribers.push(tx);
        rx
    }

    /// Starts the emission loop. Idempotent.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut state = self.state.lock();
        if state.task.is_some() {
            return;
        }

        let peers = Arc::clone(&self.peers);
        let shared = Arc::clone(&self.state);
        let config = self.config.clone();
        state.task = Some(tokio::spawn(async move {
            let mut rng = StdRng::from_rng(&mut rand::rng());
            loop {
                let max = config.interval_max.max(config.interval_min);
                let gap = rng.random_range(config.interval_min..=max);
                tokio::time::sleep(gap).await;
                let Some(message) = random_message(&mut rng, &peers) else {
                    continue;
                };
                broadcast(&shared, &message);
            }
        }));
        tracing::info!(peers = self.peers.len(), "incoming feed connected");
    }

    /// Stops the emission loop. Idempotent.
    pub fn disconnect(&self) {
        if let Some(task) = self.state.lock().task.take() {
            task.abort();
            tracing::info!("incoming feed disconnected");
        }
    }

    /// Whether the emission loop is running.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.lock().task.is_some()
    }

    /// Delivers `message` to every live subscriber right away.
    ///
    /// Returns the number of subscribers that accepted it.
    pub fn emit(&self, message: &Message) -> usize {
        broadcast(&self.state, message)
    }
}

impl Drop for IncomingFeed {
    fn drop(&mut self) {
        if let Some(task) = self.state.lock().task.take() {
            task.abort();
        }
    }
}

fn broadcast(state: &Mutex<FeedState>, message: &Message) -> usize {
    let mut delivered = 0;
    state.lock().subscribers.retain(|tx| match tx.try_send(message.clone()) {
        Ok(()) => {
            delivered += 1;
            true
        }
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::warn!(chat = %message.chat_id, "subscriber lagging, dropped incoming message");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    });
    delivered
}

/// Builds a `Delivered` message from a random peer into that peer's chat.
fn random_message<R: Rng + ?Sized>(rng: &mut R, peers: &[User]) -> Option<Message> {
    let peer = peers.choose(rng)?;
    let text = SAMPLE_INCOMING.choose(rng).copied().unwrap_or_default();
    Some(Message {
        id: MessageId::new(),
        chat_id: ChatId::new(peer.id.as_str()),
        text: text.to_string(),
        sender_id: peer.id.clone(),
        timestamp: Timestamp::now(),
        status: MessageStatus::Delivered,
    })
}
