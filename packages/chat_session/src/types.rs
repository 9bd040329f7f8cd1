use serde::{Deserialize, Serialize};

/// A conversation thread as reported by the messaging account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Opaque identifier assigned by the messaging account
    pub id: String,
    /// Display name (contact or group name)
    pub name: String,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub unread_count: u32,
    /// Most recent message, if the chat has any
    #[serde(default)]
    pub last_message: Option<Message>,
}

impl Chat {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_group: false,
            unread_count: 0,
            last_message: None,
        }
    }

    pub fn with_last_message(mut self, message: Message) -> Self {
        self.last_message = Some(message);
        self
    }

    /// Timestamp used for recency ordering. Chats without a last message
    /// count as the oldest possible (0).
    pub fn last_activity(&self) -> i64 {
        self.last_message.as_ref().map(|m| m.timestamp).unwrap_or(0)
    }
}

/// A single message inside a chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Chat this message belongs to
    pub chat_id: String,
    pub body: String,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    /// True when the account owner sent this message
    pub from_me: bool,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

impl Message {
    /// Plain text message.
    pub fn text(
        chat_id: impl Into<String>,
        body: impl Into<String>,
        timestamp: i64,
        from_me: bool,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            body: body.into(),
            timestamp,
            from_me,
            kind: MessageKind::Chat,
        }
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Message type as reported by the messaging account.
///
/// Only [`MessageKind::Chat`] carries a text body viewers render. Anything the
/// account reports that is not in this list decodes as `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Chat,
    Image,
    Video,
    Audio,
    Ptt,
    Document,
    Sticker,
    Location,
    Vcard,
    Revoked,
    #[serde(other)]
    Unknown,
}

impl MessageKind {
    pub fn is_text(self) -> bool {
        matches!(self, MessageKind::Chat)
    }
}
