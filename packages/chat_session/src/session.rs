use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::types::{Chat, Message};

/// Upper bound on messages returned by a single history fetch.
pub const DEFAULT_FETCH_LIMIT: usize = 50;

/// Capacity of the per-session event channel.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle of the single messaging session a bridge owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Uninitialized,
    AwaitingAuthentication,
    Authenticated,
    Terminated,
}

impl SessionState {
    /// State after observing `event`. The lifecycle only moves forward:
    /// a challenge never leaves `Authenticated`, and Terminated is final.
    pub fn after(self, event: &SessionEvent) -> SessionState {
        match (self, event) {
            (SessionState::Terminated, _) => SessionState::Terminated,
            (_, SessionEvent::Disconnected(_)) => SessionState::Terminated,
            (_, SessionEvent::Ready) => SessionState::Authenticated,
            (SessionState::Authenticated, SessionEvent::Qr(_)) => SessionState::Authenticated,
            (_, SessionEvent::Qr(_)) => SessionState::AwaitingAuthentication,
            (state, SessionEvent::MessageCreate(_)) => state,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            SessionState::Uninitialized => 0,
            SessionState::AwaitingAuthentication => 1,
            SessionState::Authenticated => 2,
            SessionState::Terminated => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => SessionState::Uninitialized,
            1 => SessionState::AwaitingAuthentication,
            2 => SessionState::Authenticated,
            _ => SessionState::Terminated,
        }
    }
}

/// Notifications emitted by the messaging account.
///
/// Also the frame format of the gateway event stream:
/// `{"event": "qr", "data": "<challenge>"}`, `{"event": "ready"}`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Login challenge (raw string to be encoded as a scannable code)
    Qr(String),
    /// Authentication succeeded
    Ready,
    /// A message was sent or received on any chat
    MessageCreate(Message),
    /// The account connection ended
    Disconnected(String),
}

/// The external messaging account, as far as the bridge is concerned.
///
/// Events are delivered through [`subscribe`](Self::subscribe); subscribe
/// before calling [`initialize`](Self::initialize) so the first login
/// challenge is not missed.
#[async_trait]
pub trait MessagingSession: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    fn state(&self) -> SessionState;

    /// Start the session. Emits `Qr` until authenticated, then `Ready`.
    async fn initialize(&self) -> Result<()>;

    async fn list_chats(&self) -> Result<Vec<Chat>>;

    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Chat>;

    /// Up to `limit` most recent messages, oldest first.
    async fn fetch_messages(&self, chat: &Chat, limit: usize) -> Result<Vec<Message>>;

    async fn send_message(&self, chat: &Chat, body: &str) -> Result<()>;
}

/// Lock-free holder for a [`SessionState`] shared with background tasks.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: SessionState) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: SessionState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Move from `current` to `new` only if no one else changed the state first.
    pub(crate) fn transition(&self, current: SessionState, new: SessionState) -> bool {
        self.0
            .compare_exchange(current.to_u8(), new.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Apply `event` atomically and return the resulting state.
    pub(crate) fn observe(&self, event: &SessionEvent) -> SessionState {
        let previous = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(SessionState::from_u8(current).after(event).to_u8())
            })
            .unwrap_or_else(|current| current);
        SessionState::from_u8(previous).after(event)
    }
}
