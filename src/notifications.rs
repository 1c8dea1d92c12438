// src/notifications.rs
//! Success and error notifications with automatic expiry

use std::fmt;
use std::time::Duration;

pub const SUCCESS_TTL: Duration = Duration::from_millis(5_000);
pub const ERROR_TTL: Duration = Duration::from_millis(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Success,
    Error,
}

impl NotificationKind {
    pub fn ttl(self) -> Duration {
        match self {
            NotificationKind::Success => SUCCESS_TTL,
            NotificationKind::Error => ERROR_TTL,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Success => f.write_str("success"),
            NotificationKind::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub message: String,
    pub expires_after: Duration,
}

impl Notification {
    pub fn new(id: u64, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            message: message.into(),
            expires_after: kind.ttl(),
        }
    }
}

/// At most one visible notification per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notifications {
    success: Option<Notification>,
    error: Option<Notification>,
}

impl Notifications {
    pub fn success(&self) -> Option<&Notification> {
        self.success.as_ref()
    }

    pub fn error(&self) -> Option<&Notification> {
        self.error.as_ref()
    }

    /// Replaces whatever notification of the same kind is showing.
    pub fn show(&mut self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => self.success = Some(notification),
            NotificationKind::Error => self.error = Some(notification),
        }
    }

    /// Clears the slot only if it still holds notification `id`.
    pub fn expire(&mut self, kind: NotificationKind, id: u64) {
        let slot = self.slot_mut(kind);
        if slot.as_ref().is_some_and(|n| n.id == id) {
            *slot = None;
        }
    }

    pub fn clear(&mut self, kind: NotificationKind) {
        *self.slot_mut(kind) = None;
    }

    fn slot_mut(&mut self, kind: NotificationKind) -> &mut Option<Notification> {
        match kind {
            NotificationKind::Success => &mut self.success,
            NotificationKind::Error => &mut self.error,
        }
    }
}
