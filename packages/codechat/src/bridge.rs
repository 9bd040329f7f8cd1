//! Session Relay
//!
//! Turns messaging session events into pushes for connected viewers:
//!
//! - `qr`: encode the challenge as an image and push it, until authenticated
//! - `ready`: push the chat list once
//! - `message_create`: push the whole chat list re-sorted by recency
//!
//! Every failure is logged and dropped; the relay itself never stops on error.

use anyhow::{Context, Result};
use chat_session::{
    GatewaySession, LoopbackSession, Message, MessagingSession, PushEvent, SessionEvent,
    with_new_message,
};
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Backend, SessionConfig};
use crate::metrics::ServerMetrics;
use crate::push::PushHub;
use crate::qr;

const DEMO_CHALLENGE_ROTATION: Duration = Duration::from_secs(20);
const DEMO_REPLY_DELAY: Duration = Duration::from_secs(2);

/// Build the messaging session selected by `config`.
pub fn connect_session(config: &SessionConfig) -> Result<Arc<dyn MessagingSession>> {
    match config.backend {
        Backend::Gateway => {
            info!("Using messaging gateway at {}", config.gateway_url);
            let session = GatewaySession::new(&config.gateway_url)
                .with_context(|| format!("Invalid gateway url {}", config.gateway_url))?;
            Ok(Arc::new(session))
        }
        Backend::Loopback => {
            info!("Using in-process loopback account");
            let mut session = LoopbackSession::demo()
                .with_challenge_rotation(DEMO_CHALLENGE_ROTATION)
                .with_auto_reply(DEMO_REPLY_DELAY);
            if let Some(delay) = config.auto_pair {
                info!("Loopback account pairs itself after {:?}", delay);
                session = session.with_auto_pair(delay);
            }
            Ok(Arc::new(session))
        }
    }
}

pub struct Relay {
    session: Arc<dyn MessagingSession>,
    push: Arc<PushHub>,
    metrics: Arc<ServerMetrics>,
    ready_seen: bool,
}

impl Relay {
    pub fn new(
        session: Arc<dyn MessagingSession>,
        push: Arc<PushHub>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            session,
            push,
            metrics,
            ready_seen: false,
        }
    }

    /// Subscribe to the session, spawn the relay loop, then initialize the
    /// session so the first challenge is not missed.
    pub async fn start(self, cancel: CancellationToken) -> Result<JoinHandle<()>> {
        let events = self.session.subscribe();
        let session = self.session.clone();
        let handle = tokio::spawn(self.run(events, cancel));
        session
            .initialize()
            .await
            .context("Failed to initialize messaging session")?;
        Ok(handle)
    }

    pub async fn run(
        mut self,
        mut events: broadcast::Receiver<SessionEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Relay cancelled");
                    break;
                }
                event = events.recv() => match event {
                    Ok(event) => self.handle(event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Relay lagged behind session by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Session event stream closed");
                        break;
                    }
                },
            }
        }
    }

    pub async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Qr(challenge) => self.on_qr(&challenge),
            SessionEvent::Ready => self.on_ready().await,
            SessionEvent::MessageCreate(message) => self.on_message_create(&message).await,
            SessionEvent::Disconnected(reason) => {
                warn!("Messaging session disconnected: {}", reason);
            }
        }
    }

    fn on_qr(&self, challenge: &str) {
        if self.ready_seen {
            debug!("Ignoring login challenge after authentication");
            return;
        }
        info!("Login challenge received");
        if std::io::stderr().is_terminal() {
            match qr::challenge_text(challenge) {
                Ok(text) => eprintln!("{}", text),
                Err(e) => debug!("Cannot draw challenge in terminal: {}", e),
            }
        }
        match qr::challenge_data_url(challenge) {
            Ok(url) => {
                self.metrics.challenge_relayed();
                self.publish(PushEvent::Qr(url));
            }
            Err(e) => {
                self.metrics.relay_error();
                error!("Failed to encode login challenge: {:#}", e);
            }
        }
    }

    async fn on_ready(&mut self) {
        if self.ready_seen {
            debug!("Ignoring repeated ready notification");
            return;
        }
        self.ready_seen = true;
        info!("Client is ready!");
        match self.session.list_chats().await {
            Ok(chats) => {
                info!("Loaded {} chats", chats.len());
                self.publish(PushEvent::Ready(chats));
            }
            Err(e) => {
                self.metrics.relay_error();
                error!("Failed to list chats after ready: {}", e);
            }
        }
    }

    async fn on_message_create(&self, message: &Message) {
        self.metrics.message_observed();
        match self.session.list_chats().await {
            Ok(chats) => {
                if !chats.iter().any(|c| c.id == message.chat_id) {
                    debug!("New message for unlisted chat {}", message.chat_id);
                }
                self.publish(PushEvent::MessageCreate(with_new_message(chats, message)));
            }
            Err(e) => {
                self.metrics.relay_error();
                error!("Failed to list chats after new message: {}", e);
            }
        }
    }

    fn publish(&self, event: PushEvent) {
        self.metrics.push_published();
        self.push.publish(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_session::{Chat, LoopbackSession, SessionState};
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;

    fn session() -> Arc<LoopbackSession> {
        Arc::new(
            LoopbackSession::new()
                .with_chat(
                    Chat::new("old@c.us", "Old"),
                    vec![Message::text("old@c.us", "ancient", 100, false)],
                )
                .with_chat(
                    Chat::new("new@c.us", "New"),
                    vec![Message::text("new@c.us", "recent", 200, false)],
                )
                .with_chat(Chat::new("quiet@c.us", "Quiet"), vec![]),
        )
    }

    fn relay_for(
        session: Arc<LoopbackSession>,
    ) -> (Relay, broadcast::Receiver<PushEvent>, Arc<ServerMetrics>) {
        let push = Arc::new(PushHub::new(16));
        let rx = push.subscribe();
        let metrics = Arc::new(ServerMetrics::new());
        (Relay::new(session, push, metrics.clone()), rx, metrics)
    }

    async fn paired(session: &LoopbackSession) {
        session.initialize().await.unwrap();
        session.pair();
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    async fn next_push(rx: &mut broadcast::Receiver<PushEvent>) -> PushEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("push timed out")
            .unwrap()
    }

    fn ids(chats: &[Chat]) -> Vec<&str> {
        chats.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn qr_is_pushed_as_data_url() {
        let (mut relay, mut rx, metrics) = relay_for(session());
        relay.handle(SessionEvent::Qr("loopback@1".into())).await;

        match rx.try_recv().unwrap() {
            PushEvent::Qr(url) => assert!(url.starts_with("data:image/svg+xml;base64,")),
            other => panic!("expected qr, got {other:?}"),
        }
        assert_eq!(metrics.snapshot().session.challenges, 1);
    }

    #[tokio::test]
    async fn ready_pushes_chats_once() {
        let session = session();
        paired(&session).await;
        let (mut relay, mut rx, _) = relay_for(session);

        relay.handle(SessionEvent::Ready).await;
        match rx.try_recv().unwrap() {
            PushEvent::Ready(chats) => {
                assert_eq!(ids(&chats), vec!["old@c.us", "new@c.us", "quiet@c.us"]);
            }
            other => panic!("expected ready, got {other:?}"),
        }

        relay.handle(SessionEvent::Ready).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn qr_after_ready_is_suppressed() {
        let session = session();
        paired(&session).await;
        let (mut relay, mut rx, _) = relay_for(session);

        relay.handle(SessionEvent::Ready).await;
        let _ = rx.try_recv();
        relay.handle(SessionEvent::Qr("late".into())).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn message_create_pushes_sorted_list() {
        let session = session();
        paired(&session).await;
        let (mut relay, mut rx, _) = relay_for(session);

        let message = Message::text("old@c.us", "revived", 300, false);
        relay.handle(SessionEvent::MessageCreate(message.clone())).await;

        match rx.try_recv().unwrap() {
            PushEvent::MessageCreate(chats) => {
                assert_eq!(ids(&chats), vec!["old@c.us", "new@c.us", "quiet@c.us"]);
                assert_eq!(chats[0].last_message.as_ref(), Some(&message));
            }
            other => panic!("expected message_create, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn message_for_unknown_chat_still_broadcasts() {
        let session = session();
        paired(&session).await;
        let (mut relay, mut rx, _) = relay_for(session);

        let message = Message::text("stranger@c.us", "hi", 999, false);
        relay.handle(SessionEvent::MessageCreate(message)).await;

        match rx.try_recv().unwrap() {
            PushEvent::MessageCreate(chats) => {
                assert_eq!(ids(&chats), vec!["new@c.us", "old@c.us", "quiet@c.us"]);
            }
            other => panic!("expected message_create, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn listing_failure_is_logged_not_pushed() {
        // Never paired, so listing chats is refused
        let (mut relay, mut rx, metrics) = relay_for(session());
        relay
            .handle(SessionEvent::MessageCreate(Message::text("old@c.us", "x", 1, false)))
            .await;

        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(metrics.snapshot().errors.relay, 1);
    }

    #[tokio::test]
    async fn started_relay_follows_session_lifecycle() {
        let session = session();
        let (relay, mut rx, _) = relay_for(session.clone());
        let cancel = CancellationToken::new();
        let handle = relay.start(cancel.clone()).await.unwrap();

        assert_eq!(next_push(&mut rx).await.name(), "qr");
        session.pair();
        assert_eq!(next_push(&mut rx).await.name(), "ready");
        session.receive("quiet@c.us", "hello").await.unwrap();
        match next_push(&mut rx).await {
            PushEvent::MessageCreate(chats) => assert_eq!(chats[0].id, "quiet@c.us"),
            other => panic!("expected message_create, got {other:?}"),
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn loopback_backend_builds_demo_session() {
        let config = SessionConfig {
            backend: Backend::Loopback,
            gateway_url: String::new(),
            auto_pair: None,
        };
        let session = connect_session(&config).unwrap();
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[test]
    fn invalid_gateway_url_is_rejected() {
        let config = SessionConfig {
            backend: Backend::Gateway,
            gateway_url: "not a url".into(),
            auto_pair: None,
        };
        assert!(connect_session(&config).is_err());
    }
}
