use super::store::{SessionStore, KEY_API_HOST, KEY_TOKEN, KEY_TOKEN_TYPE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserInfo {
    pub email: String,
    #[serde(rename = "fullName", default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl UserInfo {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

/// Payload of the `login` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    pub user_info: UserInfo,
    pub access_token: String,
    pub token_type: String,
    pub api_host: String,
}

impl AuthResult {
    pub fn credential(&self) -> SessionCredential {
        SessionCredential {
            access_token: self.access_token.clone(),
            token_type: self.token_type.clone(),
            api_host: self.api_host.clone(),
        }
    }
}

/// Token bundle identifying an authenticated session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    pub access_token: String,
    pub token_type: String,
    pub api_host: String,
}

impl std::fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCredential")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("api_host", &self.api_host)
            .finish()
    }
}

impl SessionCredential {
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    pub fn persist(&self, store: &dyn SessionStore) {
        store.set(KEY_TOKEN, &self.access_token);
        store.set(KEY_TOKEN_TYPE, &self.token_type);
        store.set(KEY_API_HOST, &self.api_host);
    }

    /// Reads the credential back; all three keys must be present and non-empty.
    pub fn restore(store: &dyn SessionStore) -> Option<Self> {
        let read = |key| store.get(key).filter(|value: &String| !value.is_empty());
        Some(Self {
            access_token: read(KEY_TOKEN)?,
            token_type: read(KEY_TOKEN_TYPE)?,
            api_host: read(KEY_API_HOST)?,
        })
    }
}
