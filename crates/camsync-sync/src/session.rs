//! Session acquisition and renewal.

use std::time::Duration;

use async_trait::async_trait;

use camsync_core::Session;

use crate::error::Result;

/// Authenticates against the video platform.
///
/// Credentials are owned by the implementation; the loop only asks for a
/// fresh session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Log in and return a session issued at `now` (Unix ms).
    async fn login(&self, now: i64) -> Result<Session>;
}

/// Why a login is needed before the next collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginReason {
    /// No session has been obtained yet (or the last login failed).
    NoSession,
    /// The current session is older than the configured max age.
    Expired,
    /// Configured to log in every cycle.
    Forced,
}

/// The loop's current session plus the renewal rules.
#[derive(Debug, Clone)]
pub struct SessionSlot {
    current: Option<Session>,
    max_age: Duration,
    always_login: bool,
}

impl SessionSlot {
    pub fn new(max_age: Duration, always_login: bool) -> Self {
        Self {
            current: None,
            max_age,
            always_login,
        }
    }

    /// `Some(reason)` if a login must happen before using the session at `now`.
    pub fn needs_login(&self, now: i64) -> Option<LoginReason> {
        match &self.current {
            None => Some(LoginReason::NoSession),
            Some(_) if self.always_login => Some(LoginReason::Forced),
            Some(s) if s.is_stale(now, self.max_age) => Some(LoginReason::Expired),
            Some(_) => None,
        }
    }

    /// Install a fresh session. Returns whether the token changed.
    pub fn replace(&mut self, session: Session) -> bool {
        let changed = self
            .current
            .as_ref()
            .map_or(true, |old| old.token() != session.token());
        self.current = Some(session);
        changed
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }
}
