//! Messaging gateway client.
//!
//! The gateway is a sidecar process that wraps the messaging account library
//! and exposes it over HTTP:
//!
//! ```text
//! POST /session                        start the account session
//! GET  /chats                          list chats
//! GET  /chats/{id}                     one chat (404 when unknown)
//! GET  /chats/{id}/messages?limit=N    recent messages, oldest first
//! POST /chats/{id}/messages {"body"}   send a text message
//! WS   /events                         {"event": "qr"|"ready"|"message_create"|"disconnected", "data": ...}
//! ```

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite;
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::session::{
    EVENT_CHANNEL_CAPACITY, MessagingSession, SessionEvent, SessionState, StateCell,
};
use crate::types::{Chat, Message};

#[derive(Serialize)]
struct OutgoingMessage<'a> {
    body: &'a str,
}

pub struct GatewaySession {
    http: reqwest::Client,
    base_url: Url,
    events_url: Url,
    state: Arc<StateCell>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl GatewaySession {
    /// Create a client for the gateway at `base_url` (e.g. `http://127.0.0.1:3000`).
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SessionError::Protocol(format!("invalid gateway url {base_url}: {e}")))?;
        let events_url = events_url_for(&base_url)?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            events_url,
            state: Arc::new(StateCell::new(SessionState::Uninitialized)),
            event_tx,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn events_url(&self) -> &Url {
        &self.events_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        join_segments(&self.base_url, segments)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, chat_id: Option<&str>) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(SessionError::from_reqwest)?;
        let resp = check_status(resp, chat_id).await?;
        resp.json::<T>().await.map_err(SessionError::from_reqwest)
    }

    fn ensure_usable(&self) -> Result<()> {
        match self.state.get() {
            SessionState::Terminated => Err(SessionError::Terminated),
            _ => Ok(()),
        }
    }
}

/// `http(s)://host/prefix` becomes `ws(s)://host/prefix/events`.
fn events_url_for(base: &Url) -> Result<Url> {
    let mut url = join_segments(base, &["events"])?;
    let scheme = match base.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(SessionError::Protocol(format!(
                "unsupported gateway scheme: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| SessionError::Protocol(format!("cannot use scheme {scheme}")))?;
    Ok(url)
}

fn join_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SessionError::Protocol(format!("gateway url cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map gateway status codes onto session errors.
async fn check_status(resp: reqwest::Response, chat_id: Option<&str>) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    match (status, chat_id) {
        (StatusCode::NOT_FOUND, Some(id)) => Err(SessionError::ChatNotFound(id.to_string())),
        (StatusCode::UNAUTHORIZED, _) | (StatusCode::CONFLICT, _) => {
            Err(SessionError::NotAuthenticated)
        }
        (s, _) if s.is_client_error() => Err(SessionError::Rejected(format!("{s}: {body}"))),
        (s, _) => Err(SessionError::Transport(format!("gateway returned {s}: {body}"))),
    }
}

/// Decode one event frame. Unknown frames are logged and skipped.
fn decode_event(text: &str) -> Option<SessionEvent> {
    match serde_json::from_str::<SessionEvent>(text) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping undecodable gateway event: {}", e);
            None
        }
    }
}

#[async_trait]
impl MessagingSession for GatewaySession {
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

        info!("Connecting to gateway event stream at {}", self.events_url);
        let (ws_stream, _) = tokio_tungstenite::connect_async(self.events_url.as_str())
            .await
            .map_err(SessionError::from_tungstenite)?;
        self.state.set(SessionState::AwaitingAuthentication);

        let state = self.state.clone();
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let (_write, mut read) = ws_stream.split();
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(tungstenite::Message::Text(text)) => {
                        if let Some(event) = decode_event(text.as_str()) {
                            debug!("Gateway event: {:?}", event);
                            state.observe(&event);
                            let _ = tx.send(event);
                        }
                    }
                    Ok(tungstenite::Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Gateway event stream error: {}", e);
                        break;
                    }
                }
            }
            if state.get() != SessionState::Terminated {
                let event = SessionEvent::Disconnected("gateway event stream closed".into());
                state.observe(&event);
                let _ = tx.send(event);
            }
        });

        let resp = self
            .http
            .post(self.endpoint(&["session"])?)
            .send()
            .await
            .map_err(SessionError::from_reqwest)?;
        check_status(resp, None).await?;
        Ok(())
    }

    async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.ensure_usable()?;
        self.get_json(self.endpoint(&["chats"])?, None).await
    }

    async fn get_chat_by_id(&self, chat_id: &str) -> Result<Chat> {
        self.ensure_usable()?;
        self.get_json(self.endpoint(&["chats", chat_id])?, Some(chat_id))
            .await
    }

    async fn fetch_messages(&self, chat: &Chat, limit: usize) -> Result<Vec<Message>> {
        self.ensure_usable()?;
        let mut url = self.endpoint(&["chats", &chat.id, "messages"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.get_json(url, Some(&chat.id)).await
    }

    async fn send_message(&self, chat: &Chat, body: &str) -> Result<()> {
        self.ensure_usable()?;
        let resp = self
            .http
            .post(self.endpoint(&["chats", &chat.id, "messages"])?)
            .json(&OutgoingMessage { body })
            .send()
            .await
            .map_err(SessionError::from_reqwest)?;
        check_status(resp, Some(&chat.id)).await?;
        Ok(())
    }
}
