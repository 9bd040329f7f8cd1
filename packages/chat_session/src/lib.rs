//! Chat Session - messaging account abstraction for codechat
//!
//! This crate owns everything both sides of the bridge agree on:
//! - Chat and message domain types
//! - The push / REST wire protocol spoken between bridge and viewers
//! - The [`MessagingSession`] trait wrapping the external messaging account
//! - Recency ordering of chat lists
//!
//! Two session implementations ship with the crate: [`GatewaySession`] talks
//! to a messaging sidecar over HTTP and WebSocket, [`LoopbackSession`] keeps
//! everything in memory and is used for demos and tests.
//!
//! # Example
//!
//! ```no_run
//! use chat_session::{LoopbackSession, MessagingSession, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = LoopbackSession::demo();
//!     let mut events = session.subscribe();
//!     session.initialize().await.unwrap();
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             SessionEvent::Qr(challenge) => println!("scan: {challenge}"),
//!             SessionEvent::Ready => {
//!                 let chats = session.list_chats().await.unwrap();
//!                 println!("{} chats", chats.len());
//!             }
//!             SessionEvent::MessageCreate(message) => println!("{}", message.body),
//!             SessionEvent::Disconnected(reason) => {
//!                 println!("gone: {reason}");
//!                 break;
//!             }
//!         }
//!     }
//! }
//! ```

mod error;
pub mod gateway;
pub mod loopback;
pub mod protocol;
pub mod recency;
mod session;
mod types;

pub use error::{Result, SessionError};
pub use gateway::GatewaySession;
pub use loopback::LoopbackSession;
pub use protocol::{ErrorResponse, PushEvent, SendMessageRequest, SendMessageResponse};
pub use recency::{attach_last_message, sort_by_recency, with_new_message};
pub use session::{DEFAULT_FETCH_LIMIT, MessagingSession, SessionEvent, SessionState};
pub use types::{Chat, Message, MessageKind};
