// src/session.rs
//! Signed-in identity, loading status and the provider seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AuthError;
use crate::store::{Reducer, Store};

/// A user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl AuthUser {
    /// `full_name` metadata when present, else the local part of the email.
    pub fn display_name(&self) -> String {
        match self.full_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl From<&AuthUser> for Session {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.display_name(),
        }
    }
}

/// Events pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Option<AuthUser>),
    SignedOut,
    TokenRefreshed,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Loaded(Option<AuthUser>),
    Auth(AuthEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub session: Option<Session>,
    pub is_loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session: None,
            is_loading: true,
        }
    }
}

impl Reducer for SessionState {
    type Event = SessionEvent;
    type Error = Infallible;

    fn reduce(&mut self, event: SessionEvent) -> Result<(), Infallible> {
        match event {
            SessionEvent::Loaded(user) => {
                self.session = user.as_ref().map(Session::from);
            }
            SessionEvent::Auth(AuthEvent::SignedIn(Some(user))) => {
                self.session = Some(Session::from(&user));
            }
            SessionEvent::Auth(AuthEvent::SignedOut) => {
                self.session = None;
            }
            SessionEvent::Auth(other) => {
                debug!("Auth event without session change: {:?}", other);
            }
        }
        self.is_loading = false;
        Ok(())
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_user(&self) -> Result<Option<AuthUser>, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;

    /// `None` when the provider still requires email confirmation.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Option<AuthUser>, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Finishes an OAuth redirect back into the app.
    async fn complete_callback(&self, _url: &str) -> Result<AuthUser, AuthError> {
        Err(AuthError::NotConfigured)
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Forwards provider events into a session store until dropped.
pub struct AuthSubscription {
    task: JoinHandle<()>,
}

impl AuthSubscription {
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct SessionStore<P: ?Sized> {
    provider: Arc<P>,
    store: Store<SessionState>,
}

impl<P: ?Sized> Clone for SessionStore<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            store: self.store.clone(),
        }
    }
}

impl<P: IdentityProvider + ?Sized + 'static> SessionStore<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            store: Store::new(SessionState::default()),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.store.subscribe()
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Asks the provider for the current user. Loading ends either way.
    pub async fn get_session(&self) -> Option<Session> {
        let user = match self.provider.current_user().await {
            Ok(user) => user,
            Err(e) => {
                warn!("Failed to restore session: {}", e);
                None
            }
        };
        self.apply(SessionEvent::Loaded(user));
        self.snapshot().session
    }

    pub fn on_auth_state_changed(&self, event: AuthEvent) {
        self.apply(SessionEvent::Auth(event));
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self.provider.sign_in(email, password).await?;
        info!("Signed in as {}", user.email);
        let session = Session::from(&user);
        self.on_auth_state_changed(AuthEvent::SignedIn(Some(user)));
        Ok(session)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Option<Session>, AuthError> {
        let user = self.provider.sign_up(email, password, full_name).await?;
        let session = user.as_ref().map(Session::from);
        self.on_auth_state_changed(AuthEvent::SignedIn(user));
        Ok(session)
    }

    /// Local session is cleared even when the provider call fails; the
    /// provider error is still returned.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let outcome = self.provider.sign_out().await;
        self.on_auth_state_changed(AuthEvent::SignedOut);
        if let Err(e) = &outcome {
            warn!("Provider sign-out failed, local session cleared anyway: {}", e);
        }
        outcome
    }

    /// Starts forwarding provider push events. Must run inside a Tokio runtime.
    pub fn listen(&self) -> AuthSubscription {
        let mut rx = self.provider.subscribe();
        let store = self.store.clone();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let _ = store.dispatch(SessionEvent::Auth(event));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Auth listener lagged, {} events skipped", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Auth listener stopped");
        });

        AuthSubscription { task }
    }

    fn apply(&self, event: SessionEvent) {
        let _ = self.store.dispatch(event);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    pub(crate) fn user(email: &str, full_name: Option<&str>) -> AuthUser {
        AuthUser {
            id: format!("id-{}", email),
            email: email.to_string(),
            full_name: full_name.map(str::to_string),
        }
    }

    pub(crate) struct FakeProvider {
        pub current: Mutex<Result<Option<AuthUser>, u16>>,
        pub sign_out_status: Option<u16>,
        pub events: broadcast::Sender<AuthEvent>,
    }

    impl FakeProvider {
        pub(crate) fn new(current: Option<AuthUser>) -> Self {
            let (events, _) = broadcast::channel(16);
            Self {
                current: Mutex::new(Ok(current)),
                sign_out_status: None,
                events,
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn current_user(&self) -> Result<Option<AuthUser>, AuthError> {
            self.current
                .lock()
                .unwrap()
                .clone()
                .map_err(|status| AuthError::Provider {
                    status,
                    body: "unavailable".to_string(),
                })
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
            if password == "wrong" {
                return Err(AuthError::Provider {
                    status: 400,
                    body: "Invalid login credentials".to_string(),
                });
            }
            Ok(user(email, None))
        }

        async fn sign_up(
            &self,
            email: &str,
            _password: &str,
            full_name: Option<&str>,
        ) -> Result<Option<AuthUser>, AuthError> {
            Ok(Some(user(email, full_name)))
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            match self.sign_out_status {
                Some(status) => Err(AuthError::Provider {
                    status,
                    body: "logout failed".to_string(),
                }),
                None => Ok(()),
            }
        }

        fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
            self.events.subscribe()
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        assert_eq!(user("ada@example.com", Some("Ada Lovelace")).display_name(), "Ada Lovelace");
        assert_eq!(user("ada@example.com", None).display_name(), "ada");
        assert_eq!(user("ada@example.com", Some("  ")).display_name(), "ada");
    }

    #[test]
    fn test_events_without_user_only_end_loading() {
        let mut state = SessionState::default();
        assert!(state.is_loading);

        state
            .reduce(SessionEvent::Auth(AuthEvent::SignedIn(None)))
            .unwrap();
        assert!(!state.is_loading);
        assert!(state.session.is_none());

        state
            .reduce(SessionEvent::Auth(AuthEvent::SignedIn(Some(user("a@b.c", None)))))
            .unwrap();
        state
            .reduce(SessionEvent::Auth(AuthEvent::TokenRefreshed))
            .unwrap();
        assert_eq!(state.session.as_ref().unwrap().name, "a");

        state.reduce(SessionEvent::Auth(AuthEvent::SignedOut)).unwrap();
        assert!(state.session.is_none());
    }

    #[tokio::test]
    async fn test_get_session_clears_loading_on_error() {
        let provider = FakeProvider::new(None);
        *provider.current.lock().unwrap() = Err(503);
        let sessions = SessionStore::new(Arc::new(provider));

        assert!(sessions.get_session().await.is_none());
        assert!(!sessions.snapshot().is_loading);
    }

    #[tokio::test]
    async fn test_get_session_restores_user() {
        let provider = FakeProvider::new(Some(user("ada@example.com", Some("Ada"))));
        let sessions = SessionStore::new(Arc::new(provider));

        let session = sessions.get_session().await.unwrap();
        assert_eq!(session.name, "Ada");
        assert_eq!(sessions.snapshot().session, Some(session));
    }

    #[tokio::test]
    async fn test_sign_in_failure_leaves_no_session() {
        let sessions = SessionStore::new(Arc::new(FakeProvider::new(None)));
        sessions.get_session().await;

        assert!(sessions.sign_in("ada@example.com", "wrong").await.is_err());
        assert!(sessions.snapshot().session.is_none());

        let session = sessions.sign_in("ada@example.com", "right").await.unwrap();
        assert_eq!(session.email, "ada@example.com");
        assert!(sessions.snapshot().session.is_some());
    }

    #[tokio::test]
    async fn test_sign_out_clears_locally_and_reports_failure() {
        let mut provider = FakeProvider::new(Some(user("ada@example.com", None)));
        provider.sign_out_status = Some(500);
        let sessions = SessionStore::new(Arc::new(provider));
        sessions.get_session().await;

        let err = sessions.sign_out().await.unwrap_err();
        assert!(matches!(err, AuthError::Provider { status: 500, .. }));
        assert!(sessions.snapshot().session.is_none());
    }

    #[tokio::test]
    async fn test_listen_forwards_until_unsubscribed() {
        let provider = Arc::new(FakeProvider::new(None));
        let sessions = SessionStore::new(provider.clone());
        let mut rx = sessions.subscribe();

        let subscription = sessions.listen();
        provider
            .events
            .send(AuthEvent::SignedIn(Some(user("ada@example.com", None))))
            .unwrap();
        rx.wait_for(|s| s.session.is_some()).await.unwrap();

        subscription.unsubscribe();
        tokio::task::yield_now().await;
        let _ = provider.events.send(AuthEvent::SignedOut);
        tokio::task::yield_now().await;
        assert!(sessions.snapshot().session.is_some());
    }
}
