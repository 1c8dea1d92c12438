// src/router.rs
//! Page selection driven by session state and explicit navigation

use std::fmt;
use tracing::debug;

use crate::auth::is_callback_location;
use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Landing,
    SignIn,
    SignUp,
    AuthCallback,
    Workspace,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Page::Landing => "landing",
            Page::SignIn => "signin",
            Page::SignUp => "signup",
            Page::AuthCallback => "auth-callback",
            Page::Workspace => "workspace",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterEvent {
    SessionChanged(SessionState),
    Navigate(Page),
    CallbackResolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    page: Page,
    callback_pending: bool,
    session: SessionState,
}

impl Router {
    /// Starts on the callback page for OAuth redirects, else on the landing page.
    pub fn new(location: &str) -> Self {
        let callback = is_callback_location(location);
        Self {
            page: if callback { Page::AuthCallback } else { Page::Landing },
            callback_pending: callback,
            session: SessionState::default(),
        }
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn is_callback_pending(&self) -> bool {
        self.callback_pending
    }

    /// Processes one event to completion and returns the resulting page.
    pub fn handle(&mut self, event: RouterEvent) -> Page {
        let mut requested = None;
        match event {
            RouterEvent::SessionChanged(session) => self.session = session,
            RouterEvent::CallbackResolved => self.callback_pending = false,
            RouterEvent::Navigate(page) => requested = Some(page),
        }

        let next = self.evaluate(requested);
        if next != self.page {
            debug!("Route {} -> {}", self.page, next);
            self.page = next;
        }
        self.page
    }

    fn evaluate(&self, requested: Option<Page>) -> Page {
        if self.page == Page::AuthCallback && self.callback_pending {
            return Page::AuthCallback;
        }
        if self.session.is_loading {
            return self.page;
        }
        if self.session.session.is_some() {
            return Page::Workspace;
        }

        match requested {
            Some(page @ (Page::Landing | Page::SignIn | Page::SignUp)) => page,
            _ if matches!(self.page, Page::SignIn | Page::SignUp) => self.page,
            _ => Page::Landing,
        }
    }
}
