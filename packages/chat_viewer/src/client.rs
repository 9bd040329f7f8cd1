use async_trait::async_trait;
use chat_session::protocol::{MESSAGES_PATH, PUSH_SOCKET_PATH, SEND_MESSAGE_PATH};
use chat_session::{ErrorResponse, Message, PushEvent, SendMessageRequest, SendMessageResponse};
use futures::{Stream, StreamExt};
use reqwest::{StatusCode, Url};
use std::pin::Pin;
use tokio_tungstenite::tungstenite;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("bridge is unavailable")]
    Unavailable,

    #[error("bridge returned {status}: {message}")]
    Server { status: StatusCode, message: String },

    #[error("undecodable bridge payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::Unavailable
        } else {
            Self::Other(err.into())
        }
    }

    pub fn from_tungstenite(err: tungstenite::Error) -> Self {
        let is_connect = match &err {
            tungstenite::Error::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        };
        if is_connect {
            Self::Unavailable
        } else {
            Self::Other(err.into())
        }
    }
}

/// Push events from the bridge, in arrival order.
pub type PushStream = Pin<Box<dyn Stream<Item = Result<PushEvent, ClientError>> + Send>>;

/// The two request/response calls a viewer makes against the bridge.
#[async_trait]
pub trait BridgeApi: Send + Sync {
    async fn fetch_messages(&self, chat_id: &str) -> Result<Vec<Message>, ClientError>;

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ClientError>;
}

/// HTTP and WebSocket client for a running bridge.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BridgeClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("bridge url cannot be a base: {base_url}");
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `ws(s)://` URL of the push socket.
    pub fn push_url(&self) -> anyhow::Result<Url> {
        let mut url = self.endpoint(PUSH_SOCKET_PATH, None)?;
        let scheme = if self.base_url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| anyhow::anyhow!("cannot use scheme {scheme} for {url}"))?;
        Ok(url)
    }

    /// Append `route` (and `chat_id` as one escaped segment) below the base
    /// url, keeping any path prefix the bridge is mounted under.
    fn endpoint(&self, route: &str, chat_id: Option<&str>) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("bridge url cannot be a base"))?;
            segments
                .pop_if_empty()
                .extend(route.split('/').filter(|s| !s.is_empty()));
            if let Some(chat_id) = chat_id {
                segments.push(chat_id);
            }
        }
        Ok(url)
    }

    fn messages_url(&self, chat_id: &str) -> anyhow::Result<Url> {
        self.endpoint(MESSAGES_PATH, Some(chat_id))
    }

    /// Open the push channel.
    pub async fn connect_push(&self) -> Result<PushStream, ClientError> {
        let url = self.push_url()?;
        debug!("Connecting to push channel at {}", url);
        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(ClientError::from_tungstenite)?;

        let (_write, read) = ws_stream.split();
        let events = read
            .take_while(|frame| {
                futures::future::ready(!matches!(frame, Ok(tungstenite::Message::Close(_))))
            })
            .filter_map(|frame| async move {
                match frame {
                    Ok(tungstenite::Message::Text(text)) => {
                        Some(serde_json::from_str::<PushEvent>(text.as_str()).map_err(ClientError::from))
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(ClientError::from_tungstenite(e))),
                }
            });
        Ok(Box::pin(events))
    }
}

async fn server_error(resp: reqwest::Response) -> ClientError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .or_else(|_| serde_json::from_str::<SendMessageResponse>(&text).map(|r| r.error.unwrap_or_default()))
        .unwrap_or(text);
    ClientError::Server { status, message }
}

#[async_trait]
impl BridgeApi for BridgeClient {
    async fn fetch_messages(&self, chat_id: &str) -> Result<Vec<Message>, ClientError> {
        let resp = self
            .http
            .get(self.messages_url(chat_id)?)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }
        let bytes = resp.bytes().await.map_err(ClientError::from_reqwest)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), ClientError> {
        let url = self.endpoint(SEND_MESSAGE_PATH, None)?;
        let resp = self
            .http
            .post(url)
            .json(&SendMessageRequest {
                chat_id: chat_id.to_string(),
                message: text.to_string(),
            })
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }
        let bytes = resp.bytes().await.map_err(ClientError::from_reqwest)?;
        let body: SendMessageResponse = serde_json::from_slice(&bytes)?;
        if !body.success {
            warn!("Bridge reported failed send without an error status");
            return Err(ClientError::Server {
                status: StatusCode::OK,
                message: body.error.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::ws::{self, WebSocket, WebSocketUpgrade};
    use axum::extract::Path;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chat_session::Chat;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    // ── URLs ────────────────────────────────────────────────────────────

    #[test]
    fn push_url_switches_scheme() {
        let client = BridgeClient::new("http://127.0.0.1:3000").unwrap();
        assert_eq!(client.push_url().unwrap().as_str(), "ws://127.0.0.1:3000/socket");

        let client = BridgeClient::new("https://chat.example.com").unwrap();
        assert_eq!(client.push_url().unwrap().as_str(), "wss://chat.example.com/socket");
    }

    #[test]
    fn messages_url_escapes_chat_id() {
        let client = BridgeClient::new("http://127.0.0.1:3000").unwrap();
        assert_eq!(
            client.messages_url("123@c.us").unwrap().as_str(),
            "http://127.0.0.1:3000/api/messages/123@c.us"
        );
        assert_eq!(
            client.messages_url("a/b").unwrap().as_str(),
            "http://127.0.0.1:3000/api/messages/a%2Fb"
        );
    }

    #[test]
    fn urls_keep_the_mount_prefix() {
        let client = BridgeClient::new("http://host:4000/chat/").unwrap();
        assert_eq!(client.push_url().unwrap().as_str(), "ws://host:4000/chat/socket");
        assert_eq!(
            client.messages_url("a@c.us").unwrap().as_str(),
            "http://host:4000/chat/api/messages/a@c.us"
        );
        assert_eq!(
            client.endpoint(SEND_MESSAGE_PATH, None).unwrap().as_str(),
            "http://host:4000/chat/api/messages/send-message"
        );

        let client = BridgeClient::new("http://host:4000/chat").unwrap();
        assert_eq!(client.push_url().unwrap().as_str(), "ws://host:4000/chat/socket");
    }

    #[test]
    fn rejects_non_base_url() {
        assert!(BridgeClient::new("mailto:someone@example.com").is_err());
    }

    // ── REST ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn fetch_messages_decodes_list() {
        let app = Router::new().route(
            "/api/messages/{chat_id}",
            get(|Path(chat_id): Path<String>| async move {
                Json(vec![
                    Message::text(chat_id.clone(), "hi", 10, false),
                    Message::text(chat_id, "yo", 20, true),
                ])
            }),
        );
        let client = BridgeClient::new(&serve(app).await).unwrap();

        let messages = client.fetch_messages("x@c.us").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].chat_id, "x@c.us");
        assert!(messages[1].from_me);
    }

    #[tokio::test]
    async fn fetch_failure_carries_server_message() {
        let app = Router::new().route(
            "/api/messages/{chat_id}",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to fetch messages".into(),
                    }),
                )
            }),
        );
        let client = BridgeClient::new(&serve(app).await).unwrap();

        match client.fetch_messages("x").await {
            Err(ClientError::Server { status, message }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "Failed to fetch messages");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_posts_camel_case_body() {
        let app = Router::new().route(
            "/api/messages/send-message",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["chatId"], "x@c.us");
                assert_eq!(body["message"], "hello");
                Json(SendMessageResponse::ok())
            }),
        );
        let client = BridgeClient::new(&serve(app).await).unwrap();
        client.send_message("x@c.us", "hello").await.unwrap();
    }

    #[tokio::test]
    async fn send_failure_surfaces_error_text() {
        let app = Router::new().route(
            "/api/messages/send-message",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(SendMessageResponse::failed("chat not found: x")),
                )
            }),
        );
        let client = BridgeClient::new(&serve(app).await).unwrap();

        match client.send_message("x", "hello").await {
            Err(ClientError::Server { message, .. }) => assert_eq!(message, "chat not found: x"),
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_bridge_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = BridgeClient::new(&format!("http://{addr}")).unwrap();
        assert!(matches!(
            client.fetch_messages("x").await,
            Err(ClientError::Unavailable)
        ));
        assert!(matches!(
            client.connect_push().await,
            Err(ClientError::Unavailable)
        ));
    }

    // ── Push channel ────────────────────────────────────────────────────

    async fn push_two(mut socket: WebSocket) {
        for event in [
            PushEvent::Qr("data:image/svg+xml;base64,AA".into()),
            PushEvent::Ready(vec![Chat::new("a", "Alice")]),
        ] {
            let text = serde_json::to_string(&event).unwrap();
            if socket.send(ws::Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = socket.send(ws::Message::Close(None)).await;
    }

    #[tokio::test]
    async fn push_stream_yields_events_in_order() {
        let app = Router::new().route(
            "/socket",
            get(|ws: WebSocketUpgrade| async move { ws.on_upgrade(push_two) }),
        );
        let client = BridgeClient::new(&serve(app).await).unwrap();

        let mut stream = client.connect_push().await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.name(), "qr");
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second, PushEvent::Ready(vec![Chat::new("a", "Alice")]));
        assert!(stream.next().await.is_none());
    }
}
