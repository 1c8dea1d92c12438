// src/app.rs
//! Wires the session store, the router and the workflow together

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::ResumeBackend;
use crate::error::AuthError;
use crate::router::{Page, Router, RouterEvent};
use crate::session::{
    AuthEvent, AuthSubscription, IdentityProvider, Session, SessionState, SessionStore,
};
use crate::workflow::Workflow;

pub struct App<B, P: ?Sized> {
    sessions: SessionStore<P>,
    session_rx: watch::Receiver<SessionState>,
    auth_listener: Option<AuthSubscription>,
    router: Router,
    workflow: Workflow<B>,
}

impl<B, P> App<B, P>
where
    B: ResumeBackend + 'static,
    P: IdentityProvider + ?Sized + 'static,
{
    /// `location` decides whether the app opens on the OAuth callback page.
    pub fn new(workflow: Workflow<B>, provider: Arc<P>, location: &str) -> Self {
        let sessions = SessionStore::new(provider);
        Self {
            session_rx: sessions.subscribe(),
            sessions,
            auth_listener: None,
            router: Router::new(location),
            workflow,
        }
    }

    /// Current page, after applying any session change made since the last call.
    pub fn page(&mut self) -> Page {
        self.drain_session_changes();
        self.router.page()
    }

    pub fn sessions(&self) -> &SessionStore<P> {
        &self.sessions
    }

    pub fn session(&self) -> Option<Session> {
        self.sessions.snapshot().session
    }

    /// The workflow is only reachable from the workspace page.
    pub fn workspace(&mut self) -> Option<&Workflow<B>> {
        (self.page() == Page::Workspace).then_some(&self.workflow)
    }

    pub fn is_listening(&self) -> bool {
        self.auth_listener
            .as_ref()
            .is_some_and(AuthSubscription::is_active)
    }

    /// Restores any persisted session, starts following provider pushes and
    /// routes accordingly.
    pub async fn start(&mut self) -> Page {
        if self.auth_listener.is_none() {
            self.auth_listener = Some(self.sessions.listen());
        }
        self.sessions.get_session().await;
        self.sync_session()
    }

    /// Stops following provider pushes. Session changes made through the
    /// store are still routed.
    pub fn stop_listening(&mut self) {
        if let Some(listener) = self.auth_listener.take() {
            listener.unsubscribe();
        }
    }

    /// Re-evaluates the page against the latest session snapshot.
    pub fn sync_session(&mut self) -> Page {
        let state = self.session_rx.borrow_and_update().clone();
        let page = self.router.handle(RouterEvent::SessionChanged(state));
        info!("Current page: {}", page);
        page
    }

    pub fn navigate(&mut self, page: Page) -> Page {
        self.drain_session_changes();
        self.router.handle(RouterEvent::Navigate(page))
    }

    fn drain_session_changes(&mut self) {
        if self.session_rx.has_changed().unwrap_or(false) {
            debug!("Session changed outside the app, re-routing");
            self.sync_session();
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Page, AuthError> {
        let result = self.sessions.sign_in(email, password).await;
        let page = self.sync_session();
        result.map(|_| page)
    }

    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<Page, AuthError> {
        let result = self.sessions.sign_up(email, password, full_name).await;
        let page = self.sync_session();
        result.map(|_| page)
    }

    /// The page always reflects the signed-out state, even on error.
    pub async fn sign_out(&mut self) -> Result<Page, AuthError> {
        let result = self.sessions.sign_out().await;
        let page = self.sync_session();
        result.map(|_| page)
    }

    /// Resolves a pending OAuth callback; the callback page is left either way.
    pub async fn complete_callback(&mut self, url: &str) -> Result<Page, AuthError> {
        let result = self.sessions.provider().complete_callback(url).await;
        match &result {
            Ok(user) => self
                .sessions
                .on_auth_state_changed(AuthEvent::SignedIn(Some(user.clone()))),
            Err(e) => {
                warn!("OAuth callback failed: {}", e);
                self.sessions.on_auth_state_changed(AuthEvent::SignedIn(None));
            }
        }

        self.router.handle(RouterEvent::CallbackResolved);
        let page = self.sync_session();
        result.map(|_| page)
    }
}
