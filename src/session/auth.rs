use super::credential::{SessionCredential, UserInfo};
use super::store::SessionStore;
use crate::error::GatewayError;
use crate::gateway::CommandGateway;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    LoggedOut,
    LoggingIn,
    LoggedIn {
        user: UserInfo,
    },
}

impl AuthState {
    pub fn user(&self) -> Option<&UserInfo> {
        match self {
            Self::LoggedIn { user } => Some(user),
            _ => None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn { .. })
    }
}

/// Validates a stored credential against the account service.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn get_self(&self, credential: &SessionCredential) -> Result<UserInfo, GatewayError>;
}

pub struct SessionManager {
    gateway: CommandGateway,
    store: Arc<dyn SessionStore>,
    identity: Arc<dyn IdentityApi>,
    credential: Mutex<Option<SessionCredential>>,
    state: watch::Sender<AuthState>,
}

impl SessionManager {
    pub fn new(
        gateway: CommandGateway,
        store: Arc<dyn SessionStore>,
        identity: Arc<dyn IdentityApi>,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::LoggedOut);
        Self {
            gateway,
            store,
            identity,
            credential: Mutex::new(None),
            state,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn credential(&self) -> Option<SessionCredential> {
        self.credential.lock().ok().and_then(|c| c.clone())
    }

    pub fn gateway(&self) -> &CommandGateway {
        &self.gateway
    }

    fn set_credential(&self, credential: Option<SessionCredential>) {
        if let Ok(mut slot) = self.credential.lock() {
            *slot = credential;
        }
    }

    fn invalidate(&self) {
        self.set_credential(None);
        self.store.clear();
        self.state.send_replace(AuthState::LoggedOut);
    }

    /// Publishes a restore outcome only while still logged out. A login that
    /// started meanwhile owns the state from then on.
    fn settle(&self, next: AuthState) -> bool {
        self.state.send_if_modified(|state| {
            if *state != AuthState::LoggedOut {
                return false;
            }
            *state = next;
            true
        })
    }

    /// Startup path: revalidate a stored credential, else ask the backend
    /// whether it already holds an authenticated session.
    pub async fn restore(&self) {
        if let Some(credential) = SessionCredential::restore(self.store.as_ref()) {
            debug!(api_host = %credential.api_host, "Restoring stored session");
            self.set_credential(Some(credential.clone()));

            match self.identity.get_self(&credential).await {
                Ok(user) => {
                    info!(email = %user.email, "Session restored");
                    if !self.settle(AuthState::LoggedIn { user }) {
                        debug!("Login already under way, keeping its state");
                    }
                    return;
                }
                Err(e) => {
                    warn!("Stored session rejected: {}", e);
                    // A login may have replaced the credential while it was checked.
                    if self.credential().as_ref() == Some(&credential) {
                        self.set_credential(None);
                        self.store.clear();
                    }
                }
            }
        }

        let next = match self.gateway.check_auth().await {
            Ok(user) => {
                info!(email = %user.email, "Backend session is authenticated");
                AuthState::LoggedIn { user }
            }
            Err(e) => {
                debug!("No ambient session: {}", e);
                AuthState::LoggedOut
            }
        };
        if !self.settle(next) {
            debug!("Login already under way, keeping its state");
        }
    }

    /// Acquires a fresh credential. Does nothing while a login is in flight.
    pub async fn login(&self) -> Result<(), GatewayError> {
        let mut previous = AuthState::LoggedOut;
        let started = self.state.send_if_modified(|state| {
            if *state == AuthState::LoggingIn {
                return false;
            }
            previous = std::mem::replace(state, AuthState::LoggingIn);
            true
        });
        if !started {
            debug!("Login already in progress");
            return Ok(());
        }

        match self.gateway.login().await {
            Ok(auth) => {
                let credential = auth.credential();
                credential.persist(self.store.as_ref());
                self.set_credential(Some(credential));
                info!(email = %auth.user_info.email, "Logged in");
                self.state.send_replace(AuthState::LoggedIn {
                    user: auth.user_info,
                });
                Ok(())
            }
            Err(e) => {
                error!("Login failed: {}", e);
                if e.is_unauthorized() {
                    self.invalidate();
                } else {
                    self.state.send_replace(previous);
                }
                Err(e)
            }
        }
    }

    pub async fn logout(&self) -> Result<(), GatewayError> {
        let result = self.gateway.clear_user_cache().await;
        if let Err(e) = &result {
            error!("Failed to clear backend user cache: {}", e);
        }
        info!("Logged out");
        self.invalidate();
        result
    }

    pub async fn delete_all_data(&self) -> Result<(), GatewayError> {
        let result = self.gateway.clear_cache().await;
        if let Err(e) = &result {
            error!("Failed to clear backend cache: {}", e);
        }
        info!("Local data deleted");
        self.invalidate();
        result
    }

    /// Passes a gateway result through, dropping the session on `Unauthorized`.
    pub fn observe<T>(&self, result: Result<T, GatewayError>) -> Result<T, GatewayError> {
        if let Err(e) = &result {
            if e.is_unauthorized() {
                warn!("Session expired: {}", e);
                self.invalidate();
            }
        }
        result
    }

    /// Current user from the backend, or `None` when not authenticated.
    pub async fn query_user(&self) -> Option<UserInfo> {
        match self.observe(self.gateway.get_user().await) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!("User not authenticated: {}", e);
                None
            }
        }
    }

    pub async fn initials(&self) -> Option<String> {
        let user = self.state().user().cloned()?;
        match self
            .observe(self.gateway.get_initials(user.full_name.as_deref()).await)
        {
            Ok(initials) => Some(initials),
            Err(e) => {
                warn!("Failed to fetch initials: {}", e);
                None
            }
        }
    }
}
