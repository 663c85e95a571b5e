//! Plain data types shared by every camsync crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A named stream-playback URL, the unit of delivery to the sink.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamEndpoint {
    /// Stable identifier for a camera/channel combination.
    pub name: String,
    /// Fully formed playback URL, embedding the session token.
    pub url: String,
}

impl StreamEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl fmt::Debug for StreamEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamEndpoint({} -> {})", self.name, self.url)
    }
}

/// The world as of one collection cycle. Recomputed every cycle.
pub type Snapshot = Vec<StreamEndpoint>;

/// Last successfully delivered `name -> url` mapping.
///
/// A `BTreeMap` keeps the persisted JSON stable across saves.
pub type Cache = BTreeMap<String, String>;

/// An authentication token plus the time it was issued.
///
/// Timestamps are Unix milliseconds.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    issued_at: i64,
}

impl Session {
    pub fn new(token: impl Into<String>, issued_at: i64) -> Self {
        Self {
            token: token.into(),
            issued_at,
        }
    }

    /// The raw token, for URL construction and API queries.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Issue time (Unix ms).
    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    /// Age of the session at `now` (Unix ms). Clock skew clamps to zero.
    pub fn age(&self, now: i64) -> Duration {
        Duration::from_millis(now.saturating_sub(self.issued_at).max(0) as u64)
    }

    /// A session is stale once it is strictly older than `max_age`.
    pub fn is_stale(&self, now: i64, max_age: Duration) -> bool {
        self.age(now) > max_age
    }

    /// Token prefix safe to put in logs.
    pub fn redacted(&self) -> String {
        let prefix: String = self.token.chars().take(6).collect();
        format!("{prefix}…")
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.redacted())
            .field("issued_at", &self.issued_at)
            .finish()
    }
}
