use chat_session::{Chat, Message, PushEvent};
use tracing::{debug, warn};

use crate::render::render_transcript;

/// Transcript shown before any conversation has been opened.
pub const WELCOME_BANNER: &str = "/*

Hello!
This is codechat. Your chats are listed in the sidebar; open one to read it
here and type in the terminal below to reply to the active conversation.

*/";

/// Side effect a state transition asks the caller to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerCommand {
    FetchMessages { chat_id: String },
    SendMessage { chat_id: String, text: String },
}

impl ViewerCommand {
    fn fetch(chat_id: &str) -> Self {
        ViewerCommand::FetchMessages {
            chat_id: chat_id.to_string(),
        }
    }
}

/// Client-local UI state. Nothing here outlives the viewer process.
#[derive(Debug, Clone)]
pub struct ViewerState {
    tabs: Vec<String>,
    active: Option<String>,
    transcript: String,
    contacts: Vec<Chat>,
    challenge: Option<String>,
    challenge_visible: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerState {
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            active: None,
            transcript: WELCOME_BANNER.to_string(),
            contacts: Vec::new(),
            challenge: None,
            challenge_visible: false,
        }
    }

    /// Open tabs in the order they were first opened.
    pub fn tabs(&self) -> &[String] {
        &self.tabs
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// Contact list as last pushed by the bridge.
    pub fn contacts(&self) -> &[Chat] {
        &self.contacts
    }

    /// Last login challenge image (`data:` URL).
    pub fn challenge(&self) -> Option<&str> {
        self.challenge.as_deref()
    }

    pub fn challenge_visible(&self) -> bool {
        self.challenge_visible
    }

    /// Display name for a chat id, if the contact list knows it.
    pub fn contact_name(&self, chat_id: &str) -> Option<&str> {
        self.contacts
            .iter()
            .find(|c| c.id == chat_id)
            .map(|c| c.name.as_str())
    }

    /// Activate `chat_id`, adding a tab for it if it has none yet.
    pub fn open_conversation(&mut self, chat_id: &str) -> ViewerCommand {
        self.active = Some(chat_id.to_string());
        if !self.tabs.iter().any(|t| t == chat_id) {
            self.tabs.push(chat_id.to_string());
        }
        ViewerCommand::fetch(chat_id)
    }

    /// Replace the transcript with a freshly fetched message list.
    pub fn apply_messages(&mut self, messages: &[Message]) {
        self.transcript = render_transcript(messages);
    }

    /// Close a tab. Closing the active tab falls back to the most recently
    /// opened remaining tab, or clears the view when none is left.
    pub fn close_tab(&mut self, chat_id: &str) -> Option<ViewerCommand> {
        self.tabs.retain(|t| t != chat_id);

        if self.active.as_deref() != Some(chat_id) {
            return None;
        }

        match self.tabs.last().cloned() {
            Some(next) => Some(self.open_conversation(&next)),
            None => {
                self.active = None;
                self.transcript.clear();
                None
            }
        }
    }

    /// Send `text` to the active conversation. Without one, nothing is sent.
    pub fn send_message(&self, text: &str) -> Option<ViewerCommand> {
        let Some(chat_id) = self.active.as_deref() else {
            warn!("No contact selected.");
            return None;
        };
        debug!("Sending {:?} to {}", text, chat_id);
        Some(ViewerCommand::SendMessage {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
        })
    }

    /// A send finished. The conversation is refreshed whether or not the send
    /// succeeded.
    pub fn send_completed(&self, chat_id: &str) -> ViewerCommand {
        ViewerCommand::fetch(chat_id)
    }

    /// React to a push from the bridge.
    pub fn handle_push(&mut self, event: PushEvent) -> Option<ViewerCommand> {
        match event {
            PushEvent::Qr(image) => {
                self.challenge = Some(image);
                self.challenge_visible = true;
                None
            }
            PushEvent::Ready(chats) => {
                self.contacts = chats;
                self.challenge_visible = false;
                None
            }
            PushEvent::MessageCreate(chats) => {
                self.contacts = chats;
                self.active.as_deref().map(ViewerCommand::fetch)
            }
        }
    }
}
