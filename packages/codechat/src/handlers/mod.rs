pub mod health;
pub mod messages;
pub mod websocket;

// Re-export all handlers for easy route registration
pub use health::{health_handler, health_live_handler, metrics_handler};
pub use messages::{get_messages, send_message};
pub use websocket::push_socket_handler;
