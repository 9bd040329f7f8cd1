/// Errors surfaced by a messaging session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No chat with this identifier exists on the account
    #[error("chat not found: {0}")]
    ChatNotFound(String),

    /// The session has not completed the login challenge yet
    #[error("session is not authenticated")]
    NotAuthenticated,

    /// The account refused the operation (e.g. an invalid send)
    #[error("rejected by messaging account: {0}")]
    Rejected(String),

    /// Network or I/O failure talking to the account
    #[error("transport error: {0}")]
    Transport(String),

    /// The other side answered with something we could not understand
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The session has ended and can no longer be used
    #[error("session terminated")]
    Terminated,
}

impl SessionError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }

    pub fn from_tungstenite(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
