//! In-process messaging account.
//!
//! Behaves like a real account from the bridge's point of view: it emits a
//! login challenge on [`initialize`](MessagingSession::initialize), becomes
//! ready once paired, and emits `MessageCreate` for every message sent or
//! received. Nothing leaves the process.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::session::{
    EVENT_CHANNEL_CAPACITY, MessagingSession, SessionEvent, SessionState, StateCell,
};
use crate::types::{Chat, Message};

struct LoopbackChat {
    chat: Chat,
    history: Vec<Message>,
}

impl LoopbackChat {
    fn snapshot(&self) -> Chat {
        let mut chat = self.chat.clone();
        chat.last_message = self.history.last().cloned();
        chat
    }
}

type ChatStore = Arc<RwLock<Vec<LoopbackChat>>>;

pub struct LoopbackSession {
    chats: ChatStore,
    state: Arc<StateCell>,
    event_tx: broadcast::Sender<SessionEvent>,
    auto_pair: Option<Duration>,
    challenge_rotation: Option<Duration>,
    auto_reply: Option<Duration>,
}

impl Default for LoopbackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackSession {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            chats: Arc::new(RwLock::new(Vec::new())),
            state: Arc::new(StateCell::new(SessionState::Uninitialized)),
            event_tx,
            auto_pair: None,
            challenge_rotation: None,
            auto_reply: None,
        }
    }

    /// Add a chat with its message history (oldest first).
    pub fn with_chat(self, chat: Chat, history: Vec<Message>) -> Self {
        match self.chats.try_write() {
            Ok(mut chats) => chats.push(LoopbackChat { chat, history }),
            Err(_) => warn!("Chat store busy, dropping seeded chat {}", chat.id),
        }
        self
    }

    /// Complete the login challenge by itself after `delay`.
    pub fn with_auto_pair(mut self, delay: Duration) -> Self {
        self.auto_pair = Some(delay);
        self
    }

    /// Emit a fresh challenge every `period` until paired.
    pub fn with_challenge_rotation(mut self, period: Duration) -> Self {
        self.challenge_rotation = Some(period);
        self
    }

    /// Have the other side answer every sent message after `delay`.
    pub fn with_auto_reply(mut self, delay: Duration) -> Self {
        self.auto_reply = Some(delay);
        self
    }

    /// A small address book for trying the viewer without a real account.
    pub fn demo() -> Self {
        let now = chrono::Utc::now().timestamp();
        let mut group = Chat::new("120363000000000001@g.us", "Release Crew");
        group.is_group = true;

        Self::new()
            .with_chat(
                Chat::new("15550001111@c.us", "Ada"),
                vec![
                    Message::text("15550001111@c.us", "did the build go green?", now - 3600, false),
                    Message::text("15550001111@c.us", "yes, shipping now", now - 3540, true),
                ],
            )
            .with_chat(
                group,
                vec![
                    Message::text("120363000000000001@g.us", "standup in 5", now - 600, false),
                ],
            )
            .with_chat(
                Chat::new("15550002222@c.us", "Linus"),
                vec![
                    Message::text("15550002222@c.us", "patch looks fine", now - 86_400, false),
                    Message::text("15550002222@c.us", "", now - 86_000, false)
                        .with_kind(crate::types::MessageKind::Image),
                ],
            )
            .with_chat(Chat::new("15550003333@c.us", "Grace"), vec![])
    }

    /// Simulate the account owner scanning the login challenge.
    pub fn pair(&self) {
        pair(&self.state, &self.event_tx);
    }

    /// Emit a fresh login challenge while still unauthenticated.
    pub fn rotate_challenge(&self) {
        rotate_challenge(&self.state, &self.event_tx);
    }

    /// Simulate an incoming message from the other side of `chat_id`.
    pub async fn receive(&self, chat_id: &str, body: &str) -> Result<Message> {
        self.ensure_authenticated()?;
        receive(&self.chats, &self.state, &self.event_tx, chat_id, body).await
    }

    /// End the session.
    pub fn terminate(&self, reason: &str) {
        emit(
            &self.state,
            &self.event_tx,
            SessionEvent::Disconnected(reason.to_string()),
        );
    }

    fn ensure_authenticated(&self) -> Result<()> {
        match self.state.get() {
            SessionState::Authenticated => Ok(()),
            SessionState::Terminated => Err(SessionError::Terminated),
            _ => Err(SessionError::NotAuthenticated),
        }
    }
}

async fn receive(
    chats: &RwLock<Vec<LoopbackChat>>,
    state: &StateCell,
    tx: &broadcast::Sender<SessionEvent>,
    chat_id: &str,
    body: &str,
) -> Result<Message> {
    let message = Message::text(chat_id, body, chrono::Utc::now().timestamp(), false);
    {
        let mut chats = chats.write().await;
        let entry = chats
            .iter_mut()
            .find(|c| c.chat.id == chat_id)
            .ok_or_else(|| SessionError::ChatNotFound(chat_id.to_string()))?;
        entry.history.push(message.clone());
        entry.chat.unread_count += 1;
    }
    emit(state, tx, SessionEvent::MessageCreate(message.clone()));
    Ok(message)
}

fn rotate_challenge(state: &StateCell, tx: &broadcast::Sender<SessionEvent>) -> bool {
    if state.get() != SessionState::AwaitingAuthentication {
        return false;
    }
    emit(state, tx, SessionEvent::Qr(new_challenge()));
    true
}

fn new_challenge() -> String {
    format!("loopback@{}", uuid::Uuid::new_v4())
}

fn emit(state: &StateCell, tx: &broadcast::Sender<SessionEvent>, event: SessionEvent) {
    state.observe(&event);
    // No subscribers is fine: events are fire-and-forget
    let _ = tx.send(event);
}

fn pair(state: &StateCell, tx: &broadcast::Sender<SessionEvent>) {
    if !state.transition(SessionState::AwaitingAuthentication, SessionState::Authenticated) {
        debug!("Ignoring pair request in state {:?}", state.get());
        return;
    }
    info!("Loopback session paired");
    let _ = tx.send(SessionEvent::Ready);
}

#[async_trait]
impl MessagingSession for LoopbackSession {
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    fn state(&self) -> SessionState {
        self.state.get()
    }

    async fn initialize(&self) -> Result<()> {
        match self.state.get() {
            SessionState::Uninitialized => {}
            SessionState::Terminated => return Err(SessionError::Terminated),
            _ => return Ok(()),
        }

        emit(&self.state, &self.event_tx, SessionEvent::Qr(new_challenge()));

        if let Some(period) = self.challenge_rotation {
            let state = self.state.clone();
            let tx = self.event_tx.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(period).await;
                    if !rotate_challenge(&state, &tx) {
                        break;
                    }
                    debug!("Loopback challenge rotated");
                }
            });
        }

        if let Some(delay) = self.auto_pair {
            let state = self.state.clone();
            let tx = self.event_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                pair(&state, &tx);
            });
        }
        Ok(())
    }

    async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.ensure_authenticated()?;
        let chats = self.chats.read().await;
        Ok(chats.iter().map(LoopbackChat::snapshot).collect())
    }

    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Chat> {
        self.ensure_authenticated()?;
        let chats = self.chats.read().await;
        chats
            .iter()
            .find(|c| c.chat.id == chat_id)
            .map(LoopbackChat::snapshot)
            .ok_or_else(|| SessionError::ChatNotFound(chat_id.to_string()))
    }

    async fn fetch_messages(&self, chat: &Chat, limit: usize) -> Result<Vec<Message>> {
        self.ensure_authenticated()?;
        let chats = self.chats.read().await;
        let entry = chats
            .iter()
            .find(|c| c.chat.id == chat.id)
            .ok_or_else(|| SessionError::ChatNotFound(chat.id.clone()))?;
        let start = entry.history.len().saturating_sub(limit);
        Ok(entry.history[start..].to_vec())
    }

    async fn send_message(&self, chat: &Chat, body: &str) -> Result<()> {
        self.ensure_authenticated()?;
        if body.trim().is_empty() {
            return Err(SessionError::Rejected("message body is empty".into()));
        }
        let message = Message::text(&chat.id, body, chrono::Utc::now().timestamp(), true);
        {
            let mut chats = self.chats.write().await;
            let entry = chats
                .iter_mut()
                .find(|c| c.chat.id == chat.id)
                .ok_or_else(|| SessionError::ChatNotFound(chat.id.clone()))?;
            entry.history.push(message.clone());
            entry.chat.unread_count = 0;
        }
        emit(&self.state, &self.event_tx, SessionEvent::MessageCreate(message));

        if let Some(delay) = self.auto_reply {
            let chats = self.chats.clone();
            let state = self.state.clone();
            let tx = self.event_tx.clone();
            let chat_id = chat.id.clone();
            let reply = format!("got it: {}", body.trim());
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if state.get() != SessionState::Authenticated {
                    return;
                }
                if let Err(e) = receive(&chats, &state, &tx, &chat_id, &reply).await {
                    debug!("Loopback auto reply dropped: {}", e);
                }
            });
        }
        Ok(())
    }
}
