mod common;

use common::{auth_payload, harness, unauthorized, user, FakeBackend};
use serde_json::json;
use std::sync::Arc;
use tactic_uploader::gateway::{CommandName, IpcResponse, IpcStatus};
use tactic_uploader::session::{
    AuthState, SessionCredential, SessionStore, KEY_API_HOST, KEY_TOKEN, KEY_TOKEN_TYPE,
};
use tokio::sync::Notify;

fn store_credential(store: &dyn SessionStore, token: &str) {
    SessionCredential {
        access_token: token.to_string(),
        token_type: "Bearer".to_string(),
        api_host: "https://openspace.ai".to_string(),
    }
    .persist(store);
}

#[tokio::test]
async fn restore_with_valid_credential_logs_in() {
    let h = harness(FakeBackend::default(), "good-token");
    store_credential(h.store.as_ref(), "good-token");

    h.session.restore().await;

    assert_eq!(
        h.session.state(),
        AuthState::LoggedIn {
            user: user("stored@openspace.ai")
        }
    );
    assert!(h.session.credential().is_some());
    assert_eq!(h.backend.calls(CommandName::CheckAuth), 0);
}

#[tokio::test]
async fn restore_with_invalid_credential_clears_storage() {
    let h = harness(FakeBackend::default(), "good-token");
    store_credential(h.store.as_ref(), "stale-token");

    h.session.restore().await;

    assert_eq!(h.session.state(), AuthState::LoggedOut);
    assert_eq!(h.session.credential(), None);
    for key in [KEY_TOKEN, KEY_TOKEN_TYPE, KEY_API_HOST] {
        assert_eq!(h.store.get(key), None);
    }
    // Falls back to the backend's own session check.
    assert_eq!(h.backend.calls(CommandName::CheckAuth), 1);
}

#[tokio::test]
async fn restore_without_credential_uses_ambient_auth() {
    let backend = FakeBackend::default();
    backend.reply(CommandName::CheckAuth, Ok(json!({ "email": "a@b.com" })));
    let h = harness(backend, "good-token");

    h.session.restore().await;

    let state = h.session.state();
    assert!(state.is_logged_in());
    assert_eq!(state.user().map(|u| u.email.as_str()), Some("a@b.com"));
}

#[tokio::test]
async fn restore_without_any_session_stays_logged_out() {
    let backend = FakeBackend::default();
    backend.reply(CommandName::CheckAuth, Err(unauthorized()));
    let h = harness(backend, "good-token");

    h.session.restore().await;

    assert_eq!(h.session.state(), AuthState::LoggedOut);
}

#[tokio::test]
async fn login_caches_the_credential() {
    let backend = FakeBackend::default();
    backend.reply(CommandName::Login, Ok(auth_payload("a@b.com", "fresh")));
    let h = harness(backend, "fresh");
    let mut states = h.session.watch();

    h.session.login().await.unwrap();

    assert_eq!(
        h.session.state(),
        AuthState::LoggedIn {
            user: user("a@b.com")
        }
    );
    assert_eq!(h.store.get(KEY_TOKEN).as_deref(), Some("fresh"));
    assert_eq!(h.store.get(KEY_TOKEN_TYPE).as_deref(), Some("Bearer"));
    assert_eq!(h.store.get(KEY_API_HOST).as_deref(), Some("https://openspace.ai"));
    assert!(states.has_changed().unwrap());
    assert!(states.borrow_and_update().is_logged_in());
}

#[tokio::test]
async fn failed_login_returns_to_previous_state() {
    let backend = FakeBackend::default();
    backend.reply(
        CommandName::Login,
        Err(IpcResponse::new(IpcStatus::Unavailable, "Device code expired")),
    );
    let h = harness(backend, "unused");

    let err = h.session.login().await.unwrap_err();

    assert!(!err.is_unauthorized());
    assert_eq!(h.session.state(), AuthState::LoggedOut);
    assert_eq!(h.store.get(KEY_TOKEN), None);
}

#[tokio::test]
async fn login_is_a_no_op_while_in_flight() {
    let gate = Arc::new(Notify::new());
    let mut backend = FakeBackend::default();
    backend.login_gate = Some(gate.clone());
    backend.reply(CommandName::Login, Ok(auth_payload("a@b.com", "fresh")));
    let h = harness(backend, "fresh");

    let first = {
        let session = h.session.clone();
        tokio::spawn(async move { session.login().await })
    };
    let mut states = h.session.watch();
    states
        .wait_for(|s| *s == AuthState::LoggingIn)
        .await
        .unwrap();

    // Second attempt returns immediately without calling the backend.
    h.session.login().await.unwrap();
    assert_eq!(h.backend.calls(CommandName::Login), 1);

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert!(h.session.state().is_logged_in());
    assert_eq!(h.backend.calls(CommandName::Login), 1);
}

#[tokio::test]
async fn restore_does_not_interrupt_a_login() {
    let gate = Arc::new(Notify::new());
    let mut backend = FakeBackend::default();
    backend.login_gate = Some(gate.clone());
    backend.reply(CommandName::Login, Ok(auth_payload("a@b.com", "fresh")));
    backend.reply(CommandName::CheckAuth, Err(unauthorized()));
    let h = harness(backend, "fresh");

    let first = {
        let session = h.session.clone();
        tokio::spawn(async move { session.login().await })
    };
    h.session
        .watch()
        .wait_for(|s| *s == AuthState::LoggingIn)
        .await
        .unwrap();

    h.session.restore().await;
    assert_eq!(h.session.state(), AuthState::LoggingIn);

    h.session.login().await.unwrap();
    assert_eq!(h.backend.calls(CommandName::Login), 1);

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert!(h.session.state().is_logged_in());
    assert_eq!(h.store.get(KEY_TOKEN).as_deref(), Some("fresh"));
}

#[tokio::test]
async fn restore_after_login_keeps_the_new_session() {
    let backend = FakeBackend::default();
    backend.reply(CommandName::Login, Ok(auth_payload("a@b.com", "fresh")));
    backend.reply(CommandName::CheckAuth, Err(unauthorized()));
    let h = harness(backend, "fresh");

    h.session.login().await.unwrap();
    h.session.restore().await;

    assert_eq!(
        h.session.state(),
        AuthState::LoggedIn {
            user: user("a@b.com")
        }
    );
    assert!(h.session.credential().is_some());
}

#[tokio::test]
async fn unauthorized_mid_session_logs_out() {
    let backend = FakeBackend::default();
    backend.reply(CommandName::Login, Ok(auth_payload("a@b.com", "fresh")));
    backend.reply(CommandName::GetUser, Err(unauthorized()));
    let h = harness(backend, "fresh");
    h.session.login().await.unwrap();

    assert_eq!(h.session.query_user().await, None);

    assert_eq!(h.session.state(), AuthState::LoggedOut);
    assert_eq!(h.session.credential(), None);
    assert_eq!(h.store.get(KEY_TOKEN), None);
}

#[tokio::test]
async fn transport_errors_keep_the_session() {
    let backend = FakeBackend::default();
    backend.reply(CommandName::Login, Ok(auth_payload("a@b.com", "fresh")));
    backend.reply(
        CommandName::GetUser,
        Err(IpcResponse::new(IpcStatus::InternalError, "boom")),
    );
    let h = harness(backend, "fresh");
    h.session.login().await.unwrap();

    assert_eq!(h.session.query_user().await, None);
    assert!(h.session.state().is_logged_in());
    assert!(h.session.credential().is_some());
}

#[tokio::test]
async fn logout_and_delete_clear_everything() {
    let backend = FakeBackend::default();
    backend.reply(CommandName::Login, Ok(auth_payload("a@b.com", "fresh")));
    backend.reply(CommandName::ClearUserCache, Ok(json!(null)));
    backend.reply(CommandName::ClearCache, Ok(json!(null)));
    let h = harness(backend, "fresh");

    h.session.login().await.unwrap();
    h.session.logout().await.unwrap();
    assert_eq!(h.session.state(), AuthState::LoggedOut);
    assert_eq!(h.store.get(KEY_TOKEN), None);
    assert_eq!(h.backend.calls(CommandName::ClearUserCache), 1);

    h.session.login().await.unwrap();
    h.session.delete_all_data().await.unwrap();
    assert_eq!(h.session.state(), AuthState::LoggedOut);
    assert_eq!(h.session.credential(), None);
    assert_eq!(h.backend.calls(CommandName::ClearCache), 1);
}

#[tokio::test]
async fn initials_come_from_the_backend() {
    let backend = FakeBackend::default();
    backend.reply(CommandName::Login, Ok(auth_payload("a@b.com", "fresh")));
    backend.reply(CommandName::GetInitials, Ok(json!("AB")));
    let h = harness(backend, "fresh");

    assert_eq!(h.session.initials().await, None);
    h.session.login().await.unwrap();
    assert_eq!(h.session.initials().await.as_deref(), Some("AB"));
}
