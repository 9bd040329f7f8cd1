//! Bridge Wire Protocol
//!
//! Types exchanged between the bridge and its viewers: push events on the
//! socket, request and response bodies on the REST endpoints.

use serde::{Deserialize, Serialize};

use crate::types::Chat;

/// Route of the message history endpoint (`GET {MESSAGES_PATH}/{chat_id}`).
pub const MESSAGES_PATH: &str = "/api/messages";

/// Route of the send endpoint.
pub const SEND_MESSAGE_PATH: &str = "/api/messages/send-message";

/// Route of the push channel WebSocket.
pub const PUSH_SOCKET_PATH: &str = "/socket";

/// Events pushed from the bridge to every connected viewer.
///
/// Serialized as `{"event": "<name>", "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum PushEvent {
    /// Login challenge rendered as a `data:` image URL
    Qr(String),
    /// Full chat list, sent once after authentication
    Ready(Vec<Chat>),
    /// Full chat list re-sorted by recency after any new message
    MessageCreate(Vec<Chat>),
}

impl PushEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::Qr(_) => "qr",
            PushEvent::Ready(_) => "ready",
            PushEvent::MessageCreate(_) => "message_create",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendMessageResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Body of a failed history request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_event_wire_names() {
        let qr = serde_json::to_value(PushEvent::Qr("data:image/svg+xml;base64,AA".into())).unwrap();
        assert_eq!(qr["event"], "qr");
        assert_eq!(qr["data"], "data:image/svg+xml;base64,AA");

        let created = serde_json::to_value(PushEvent::MessageCreate(vec![Chat::new("a", "A")])).unwrap();
        assert_eq!(created["event"], "message_create");
        assert_eq!(created["data"][0]["id"], "a");
        assert!(created["data"][0]["lastMessage"].is_null());
    }

    #[test]
    fn push_event_name_matches_tag() {
        for event in [
            PushEvent::Qr(String::new()),
            PushEvent::Ready(vec![]),
            PushEvent::MessageCreate(vec![]),
        ] {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["event"], event.name());
        }
    }

    #[test]
    fn send_request_uses_chat_id_field() {
        let req: SendMessageRequest =
            serde_json::from_str(r#"{"chatId":"a@c.us","message":"hello"}"#).unwrap();
        assert_eq!(req.chat_id, "a@c.us");
        assert_eq!(req.message, "hello");
    }

    #[test]
    fn successful_send_response_has_no_error_field() {
        let json = serde_json::to_string(&SendMessageResponse::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);

        let failed = serde_json::to_value(SendMessageResponse::failed("boom")).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"], "boom");
    }
}
