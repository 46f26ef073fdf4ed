mod auth;
mod credential;
mod store;

pub use auth::{AuthState, IdentityApi, SessionManager};
pub use credential::{AuthResult, SessionCredential, UserInfo};
pub use store::{MemorySessionStore, SessionStore, KEY_API_HOST, KEY_TOKEN, KEY_TOKEN_TYPE};
