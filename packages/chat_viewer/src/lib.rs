//! Conversation Viewer
//!
//! Client side of codechat. [`ViewerState`] holds the open tabs, the active
//! conversation and its rendered transcript; every transition returns the
//! [`ViewerCommand`] the caller has to carry out. [`Viewer`] pairs the state
//! with a [`BridgeApi`] and performs those commands, and [`BridgeClient`] is
//! the HTTP + WebSocket implementation of that API.

mod client;
mod render;
mod state;
mod viewer;

pub use client::{BridgeApi, BridgeClient, ClientError, PushStream};
pub use render::{SELF_INDENT, format_timestamp, render_transcript, render_transcript_in};
pub use state::{ViewerCommand, ViewerState, WELCOME_BANNER};
pub use viewer::Viewer;
