//! Request/response calls into the backend.

mod bridge;
mod ipc;

pub use bridge::StdioService;
pub use ipc::{IpcResponse, IpcStatus};

use crate::error::GatewayError;
use crate::session::{AuthResult, UserInfo};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Commands the backend registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    Login,
    GetUser,
    ClearUserCache,
    ClearCache,
    CheckAuth,
    GetCamera,
    GetCameraFiles,
    GetInitials,
    Req,
}

impl CommandName {
    pub const ALL: [CommandName; 9] = [
        Self::Login,
        Self::GetUser,
        Self::ClearUserCache,
        Self::ClearCache,
        Self::CheckAuth,
        Self::GetCamera,
        Self::GetCameraFiles,
        Self::GetInitials,
        Self::Req,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::GetUser => "get_user",
            Self::ClearUserCache => "clear_user_cache",
            Self::ClearCache => "clear_cache",
            Self::CheckAuth => "check_auth",
            Self::GetCamera => "get_camera",
            Self::GetCameraFiles => "get_camera_files",
            Self::GetInitials => "get_initials",
            Self::Req => "req",
        }
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandName {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| GatewayError::UnknownCommand(s.to_string()))
    }
}

/// The backend as seen from this side: one call, one answer.
#[async_trait]
pub trait ExternalService: Send + Sync {
    async fn call(&self, command: CommandName, args: Value) -> Result<Value, IpcResponse>;
}

#[derive(Clone)]
pub struct CommandGateway {
    service: Arc<dyn ExternalService>,
}

impl CommandGateway {
    pub fn new(service: Arc<dyn ExternalService>) -> Self {
        Self { service }
    }

    pub async fn invoke<T: DeserializeOwned>(
        &self,
        command: CommandName,
        args: Value,
    ) -> Result<T, GatewayError> {
        debug!(%command, "invoke");
        let payload = self.service.call(command, args).await.map_err(|response| {
            warn!(%command, status = ?response.status, "Command failed");
            GatewayError::from(response)
        })?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Like [`CommandGateway::invoke`] for a command named at runtime.
    pub async fn invoke_named<T: DeserializeOwned>(
        &self,
        command: &str,
        args: Value,
    ) -> Result<T, GatewayError> {
        let command = CommandName::from_str(command)?;
        self.invoke(command, args).await
    }

    pub async fn login(&self) -> Result<AuthResult, GatewayError> {
        self.invoke(CommandName::Login, json!({})).await
    }

    pub async fn get_user(&self) -> Result<UserInfo, GatewayError> {
        self.invoke(CommandName::GetUser, json!({})).await
    }

    pub async fn check_auth(&self) -> Result<UserInfo, GatewayError> {
        self.invoke(CommandName::CheckAuth, json!({})).await
    }

    pub async fn clear_user_cache(&self) -> Result<(), GatewayError> {
        self.invoke(CommandName::ClearUserCache, json!({})).await
    }

    pub async fn clear_cache(&self) -> Result<(), GatewayError> {
        self.invoke(CommandName::ClearCache, json!({})).await
    }

    pub async fn get_camera(&self) -> Result<String, GatewayError> {
        self.invoke(CommandName::GetCamera, json!({})).await
    }

    /// Starts the camera transfer. Results arrive as upload events.
    pub async fn get_camera_files(&self) -> Result<(), GatewayError> {
        self.invoke(CommandName::GetCameraFiles, json!({})).await
    }

    pub async fn get_initials(&self, full_name: Option<&str>) -> Result<String, GatewayError> {
        self.invoke(CommandName::GetInitials, json!({ "fullName": full_name }))
            .await
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Value,
        content_type: Option<&str>,
    ) -> Result<Value, GatewayError> {
        if method.trim().is_empty() || !path.starts_with('/') {
            return Err(GatewayError::InvalidArgument(format!(
                "bad request target: {} {}",
                method, path
            )));
        }
        let args = json!({
            "method": method,
            "path": path,
            "body": body,
            "content_type": content_type,
        });
        self.invoke(CommandName::Req, args).await
    }
}
