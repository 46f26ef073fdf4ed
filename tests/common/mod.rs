#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tactic_uploader::gateway::{CommandGateway, CommandName, ExternalService, IpcResponse, IpcStatus};
use tactic_uploader::session::{
    IdentityApi, MemorySessionStore, SessionCredential, SessionManager, SessionStore, UserInfo,
};
use tactic_uploader::GatewayError;
use tokio::sync::Notify;

/// Backend double answering each command with a scripted reply.
#[derive(Default)]
pub struct FakeBackend {
    replies: Mutex<HashMap<CommandName, Result<Value, IpcResponse>>>,
    calls: Mutex<Vec<CommandName>>,
    /// When set, `login` waits for a notification before answering.
    pub login_gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub fn reply(&self, command: CommandName, reply: Result<Value, IpcResponse>) {
        self.replies.lock().unwrap().insert(command, reply);
    }

    pub fn calls(&self, command: CommandName) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == command)
            .count()
    }
}

#[async_trait]
impl ExternalService for FakeBackend {
    async fn call(&self, command: CommandName, _args: Value) -> Result<Value, IpcResponse> {
        self.calls.lock().unwrap().push(command);
        if command == CommandName::Login {
            if let Some(gate) = &self.login_gate {
                gate.notified().await;
            }
        }
        self.replies
            .lock()
            .unwrap()
            .get(&command)
            .cloned()
            .unwrap_or_else(|| Err(IpcResponse::new(IpcStatus::NotFound, "not scripted")))
    }
}

/// Identity service that accepts exactly one token.
pub struct FakeIdentity {
    pub valid_token: String,
    pub user: UserInfo,
}

#[async_trait]
impl IdentityApi for FakeIdentity {
    async fn get_self(&self, credential: &SessionCredential) -> Result<UserInfo, GatewayError> {
        if credential.access_token == self.valid_token {
            Ok(self.user.clone())
        } else {
            Err(GatewayError::Unauthorized(
                "Token expired - please login again".to_string(),
            ))
        }
    }
}

pub fn user(email: &str) -> UserInfo {
    UserInfo {
        email: email.to_string(),
        full_name: None,
    }
}

pub fn unauthorized() -> IpcResponse {
    IpcResponse::new(IpcStatus::NotAuthenticated, "Not authenticated. Please log in.")
}

pub fn auth_payload(email: &str, token: &str) -> Value {
    json!({
        "userInfo": { "email": email },
        "accessToken": token,
        "tokenType": "Bearer",
        "apiHost": "https://openspace.ai"
    })
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub store: Arc<MemorySessionStore>,
    pub session: Arc<SessionManager>,
}

pub fn harness(backend: FakeBackend, valid_token: &str) -> Harness {
    let backend = Arc::new(backend);
    let store = Arc::new(MemorySessionStore::default());
    let identity = Arc::new(FakeIdentity {
        valid_token: valid_token.to_string(),
        user: user("stored@openspace.ai"),
    });
    let session = Arc::new(SessionManager::new(
        CommandGateway::new(backend.clone()),
        store.clone() as Arc<dyn SessionStore>,
        identity,
    ));
    Harness {
        backend,
        store,
        session,
    }
}
