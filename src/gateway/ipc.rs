use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status the backend attaches to every failed command.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub enum IpcStatus {
    Ok,
    Accepted,
    InvalidArgument,
    Conflict,
    NotAuthenticated,
    NotAuthorized,
    NotFound,
    ImATeapot,
    Unavailable,
    InternalError,
}

impl IpcStatus {
    pub fn http_code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Accepted => 202,
            Self::InvalidArgument => 400,
            Self::NotAuthenticated => 401,
            Self::NotAuthorized => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::ImATeapot => 418,
            Self::InternalError => 500,
            Self::Unavailable => 503,
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            Self::Ok => "Ok",
            Self::Accepted => "Accepted",
            Self::InvalidArgument => "Invalid argument",
            Self::Conflict => "Conflict",
            Self::NotAuthenticated => "User not logged in",
            Self::NotAuthorized => "User not authorized",
            Self::NotFound => "Resource not found",
            Self::ImATeapot => "I'm a teapot",
            Self::Unavailable => "Resource unavailable",
            Self::InternalError => "Internal error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcResponse {
    pub status: IpcStatus,
    #[serde(default)]
    pub body: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl IpcResponse {
    pub fn new(status: IpcStatus, message: impl Into<String>) -> Self {
        let body = serde_json::json!({ "message": message.into() });
        Self { status, body }
    }

    pub fn message(&self) -> String {
        serde_json::from_value::<ErrorMessage>(self.body.clone())
            .map(|m| m.message)
            .unwrap_or_else(|_| self.status.default_message().to_string())
    }
}

impl From<IpcResponse> for GatewayError {
    fn from(response: IpcResponse) -> Self {
        let message = response.message();
        match response.status {
            IpcStatus::NotAuthenticated => GatewayError::Unauthorized(message),
            status => GatewayError::transport(status.http_code(), message),
        }
    }
}
