//! Errors surfaced by calls into the backend or the OpenSpace API.
//!
//! `Unauthorized` is the only variant callers must react to: whoever
//! observes it drops the cached credential (see `SessionManager::observe`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request failed: {code} - {message}")]
    Transport { code: u16, message: String },

    #[error("Not authenticated. Please log in.")]
    NotAuthenticated,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub fn transport(code: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            code,
            message: message.into(),
        }
    }
}
