use chat_session::PushEvent;
use tracing::{error, warn};

use crate::client::BridgeApi;
use crate::state::{ViewerCommand, ViewerState};

/// A [`ViewerState`] wired to a bridge. Each operation applies the state
/// transition and then carries out whatever request it asked for.
pub struct Viewer<B> {
    api: B,
    state: ViewerState,
}

impl<B: BridgeApi> Viewer<B> {
    pub fn new(api: B) -> Self {
        Self {
            api,
            state: ViewerState::new(),
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn api(&self) -> &B {
        &self.api
    }

    pub async fn open_conversation(&mut self, chat_id: &str) {
        let command = self.state.open_conversation(chat_id);
        self.execute(command).await;
    }

    pub async fn close_tab(&mut self, chat_id: &str) {
        if let Some(command) = self.state.close_tab(chat_id) {
            self.execute(command).await;
        }
    }

    pub async fn send_message(&mut self, text: &str) {
        if let Some(command) = self.state.send_message(text) {
            self.execute(command).await;
        }
    }

    pub async fn handle_push(&mut self, event: PushEvent) {
        if let Some(command) = self.state.handle_push(event) {
            self.execute(command).await;
        }
    }

    async fn execute(&mut self, command: ViewerCommand) {
        match command {
            ViewerCommand::FetchMessages { chat_id } => self.refresh(&chat_id).await,
            ViewerCommand::SendMessage { chat_id, text } => {
                if let Err(e) = self.api.send_message(&chat_id, &text).await {
                    error!("Error sending message to {}: {}", chat_id, e);
                }
                let ViewerCommand::FetchMessages { chat_id } = self.state.send_completed(&chat_id)
                else {
                    return;
                };
                self.refresh(&chat_id).await;
            }
        }
    }

    /// Fetch and render one conversation. The transcript shows whichever
    /// response lands last; a failed fetch leaves it untouched.
    async fn refresh(&mut self, chat_id: &str) {
        match self.api.fetch_messages(chat_id).await {
            Ok(messages) => self.state.apply_messages(&messages),
            Err(e) => warn!("Error fetching messages for {}: {}", chat_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use async_trait::async_trait;
    use chat_session::{Chat, Message};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Fetch(String),
        Send(String, String),
    }

    #[derive(Default)]
    struct FakeBridge {
        histories: HashMap<String, Vec<Message>>,
        fail_sends: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeBridge {
        fn with_history(mut self, chat_id: &str, body: &str) -> Self {
            self.histories
                .entry(chat_id.to_string())
                .or_default()
                .push(Message::text(chat_id, body, 1_700_000_000, false));
            self
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BridgeApi for FakeBridge {
        async fn fetch_messages(&self, chat_id: &str) -> Result<Vec<Message>, ClientError> {
            self.calls.lock().unwrap().push(Call::Fetch(chat_id.to_string()));
            self.histories.get(chat_id).cloned().ok_or_else(|| {
                ClientError::Other(anyhow::anyhow!("no history for {chat_id}"))
            })
        }

        async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Send(chat_id.to_string(), text.to_string()));
            if self.fail_sends {
                Err(ClientError::Unavailable)
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn opening_fetches_and_renders() {
        let mut viewer = Viewer::new(FakeBridge::default().with_history("x", "hello there"));
        viewer.open_conversation("x").await;

        assert_eq!(viewer.api().calls(), vec![Call::Fetch("x".into())]);
        assert!(viewer.state().transcript().contains("\"message\": \"hello there\""));
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_transcript() {
        let mut viewer = Viewer::new(FakeBridge::default().with_history("x", "kept"));
        viewer.open_conversation("x").await;
        viewer.open_conversation("missing").await;

        assert_eq!(viewer.state().active(), Some("missing"));
        assert!(viewer.state().transcript().contains("kept"));
    }

    #[tokio::test]
    async fn send_without_active_chat_makes_no_request() {
        let mut viewer = Viewer::new(FakeBridge::default());
        viewer.send_message("into the void").await;
        assert!(viewer.api().calls().is_empty());
    }

    #[tokio::test]
    async fn send_then_refresh() {
        let mut viewer = Viewer::new(FakeBridge::default().with_history("x", "hi"));
        viewer.open_conversation("x").await;
        viewer.send_message("hello").await;

        assert_eq!(
            viewer.api().calls(),
            vec![
                Call::Fetch("x".into()),
                Call::Send("x".into(), "hello".into()),
                Call::Fetch("x".into()),
            ]
        );
    }

    #[tokio::test]
    async fn failed_send_still_refreshes() {
        let bridge = FakeBridge {
            fail_sends: true,
            ..FakeBridge::default()
        }
        .with_history("x", "hi");
        let mut viewer = Viewer::new(bridge);
        viewer.open_conversation("x").await;
        viewer.send_message("hello").await;

        assert_eq!(viewer.api().calls().last(), Some(&Call::Fetch("x".into())));
    }

    #[tokio::test]
    async fn closing_active_tab_loads_fallback() {
        let bridge = FakeBridge::default()
            .with_history("x", "from x")
            .with_history("y", "from y");
        let mut viewer = Viewer::new(bridge);
        viewer.open_conversation("x").await;
        viewer.open_conversation("y").await;
        viewer.close_tab("y").await;

        assert_eq!(viewer.state().active(), Some("x"));
        assert!(viewer.state().transcript().contains("from x"));
    }

    #[tokio::test]
    async fn message_create_refetches_only_with_active_chat() {
        let mut viewer = Viewer::new(FakeBridge::default().with_history("x", "hi"));
        let chats = vec![Chat::new("x", "Xavier")];

        viewer.handle_push(PushEvent::MessageCreate(chats.clone())).await;
        assert!(viewer.api().calls().is_empty());

        viewer.open_conversation("x").await;
        viewer.handle_push(PushEvent::MessageCreate(chats)).await;
        assert_eq!(
            viewer.api().calls(),
            vec![Call::Fetch("x".into()), Call::Fetch("x".into())]
        );
    }
}
