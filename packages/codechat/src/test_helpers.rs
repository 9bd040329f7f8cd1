use chat_session::{Chat, LoopbackSession, Message, MessagingSession};
use std::sync::Arc;

use crate::AppState;
use crate::config::ServerConfig;
use crate::metrics::ServerMetrics;
use crate::push::PushHub;

/// Build an `AppState` around an existing session with default server config.
pub fn test_app_state(session: Arc<LoopbackSession>) -> AppState {
    let server_config = ServerConfig::default();
    AppState {
        session,
        push: Arc::new(PushHub::new(server_config.push_capacity)),
        metrics: Arc::new(ServerMetrics::new()),
        server_config: Arc::new(server_config),
    }
}

/// An authenticated two-chat loopback account and an `AppState` wrapping it.
///
/// `a@c.us` has one received and one sent message; `b@c.us` is empty.
pub async fn paired_app_state() -> (AppState, Arc<LoopbackSession>) {
    let session = Arc::new(
        LoopbackSession::new()
            .with_chat(
                Chat::new("a@c.us", "Alice"),
                vec![
                    Message::text("a@c.us", "first", 1_700_000_000, false),
                    Message::text("a@c.us", "second", 1_700_000_060, true),
                ],
            )
            .with_chat(Chat::new("b@c.us", "Bob"), vec![]),
    );
    session.initialize().await.expect("initialize loopback");
    session.pair();
    (test_app_state(session.clone()), session)
}
