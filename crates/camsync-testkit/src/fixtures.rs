//! Scriptable fakes for the platform, the sink and the cache.
//!
//! All fakes use interior mutability so a test can reshape their behavior
//! between cycles through a shared reference (e.g. via `SyncLoop::sink()`).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use camsync_core::{Cache, CameraMap, ChannelSpec, Session, StreamEndpoint, StreamScheme, StreamUrlBuilder};
use camsync_store::MemoryStore;
use camsync_sync::{
    DeviceDirectory, HttpSink, IdSpace, RetryPolicy, SendConfig, SendOutcome, SessionProvider,
    SyncError,
};

/// A platform host used by fixture URLs.
pub const TEST_HOST: &str = "cms.test";

/// Shorthand for an endpoint with a predictable URL.
pub fn endpoint(name: &str) -> StreamEndpoint {
    StreamEndpoint::new(name, format!("rtmp://{TEST_HOST}/{name}"))
}

/// Build a camera map from `(key, [(label, channel)])` pairs.
pub fn camera_map(groups: &[(&str, &[(&str, u32)])]) -> CameraMap {
    groups.iter().fold(CameraMap::new(), |map, (key, channels)| {
        let specs = channels
            .iter()
            .map(|(label, ch)| ChannelSpec::new(*label, *ch))
            .collect();
        map.with_group(*key, specs)
    })
}

/// URL builder matching the fixture host.
pub fn url_builder() -> StreamUrlBuilder {
    StreamUrlBuilder::new(StreamScheme::Rtmp, TEST_HOST, 6604)
}

/// Send configuration with every pause and backoff set to zero.
pub fn fast_send_config() -> SendConfig {
    SendConfig {
        batch_size: 3,
        retry: RetryPolicy {
            max_retry: 1,
            initial_backoff: Duration::ZERO,
            backoff_cap: Duration::ZERO,
            fallback_split: true,
        },
        dry_run: false,
        batch_pause: Duration::ZERO,
        item_pause: Duration::ZERO,
    }
}

/// A memory store pre-seeded with `entries`.
pub fn seeded_store(entries: &[StreamEndpoint]) -> MemoryStore {
    let cache: Cache = entries
        .iter()
        .map(|e| (e.name.clone(), e.url.clone()))
        .collect();
    MemoryStore::with_cache(cache)
}

// ─────────────────────────────────────────────────────────────────────────────
// Sink
// ─────────────────────────────────────────────────────────────────────────────

/// Sink whose answers are scripted per test.
///
/// Resolution order for each request: an outage answers with a transport
/// error; otherwise a queued outcome is served; otherwise any request that
/// contains a rejected name gets that name's status; otherwise 200.
#[derive(Default)]
pub struct ScriptedSink {
    queue: Mutex<VecDeque<SendOutcome>>,
    rejected: Mutex<HashMap<String, u16>>,
    down: AtomicBool,
    requests: Mutex<Vec<Vec<StreamEndpoint>>>,
}

impl ScriptedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next request with `outcome`, ahead of the rules.
    pub fn push(&self, outcome: SendOutcome) -> &Self {
        self.queue.lock().unwrap().push_back(outcome);
        self
    }

    /// Any request containing `name` is answered with `code`.
    pub fn reject(&self, name: &str, code: u16) -> &Self {
        self.rejected.lock().unwrap().insert(name.to_string(), code);
        self
    }

    /// Stop rejecting `name`.
    pub fn accept(&self, name: &str) -> &Self {
        self.rejected.lock().unwrap().remove(name);
        self
    }

    /// Simulate the endpoint being unreachable.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Vec<StreamEndpoint>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Names carried by any request, in send order, with repeats.
    pub fn sent_names(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .flatten()
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }
}

#[async_trait]
impl HttpSink for ScriptedSink {
    async fn post(&self, items: &[StreamEndpoint]) -> SendOutcome {
        self.requests.lock().unwrap().push(items.to_vec());

        if self.down.load(Ordering::SeqCst) {
            return SendOutcome::Transport("connection refused".into());
        }
        if let Some(outcome) = self.queue.lock().unwrap().pop_front() {
            return outcome;
        }
        let rejected = self.rejected.lock().unwrap();
        match items.iter().find_map(|i| rejected.get(&i.name)) {
            Some(code) => SendOutcome::with_body(*code, "rejected"),
            None => SendOutcome::status(200),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Platform
// ─────────────────────────────────────────────────────────────────────────────

/// Directory answering from a fixed key → online devices table.
///
/// Keys resolve in the device id space only.
#[derive(Default)]
pub struct StaticDirectory {
    online: Mutex<HashMap<String, Vec<String>>>,
    failing: Mutex<HashSet<String>>,
    queries: AtomicUsize,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_online`](Self::set_online).
    pub fn with_online(self, key: &str, devices: &[&str]) -> Self {
        self.set_online(key, devices);
        self
    }

    pub fn set_online(&self, key: &str, devices: &[&str]) {
        self.online.lock().unwrap().insert(
            key.to_string(),
            devices.iter().map(|d| d.to_string()).collect(),
        );
    }

    /// Make every query for `key` fail (or succeed again).
    pub fn set_failing(&self, key: &str, failing: bool) {
        let mut set = self.failing.lock().unwrap();
        if failing {
            set.insert(key.to_string());
        } else {
            set.remove(key);
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceDirectory for StaticDirectory {
    async fn query_online(&self, _session: &Session, space: IdSpace, key: &str) -> camsync_sync::Result<Vec<String>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(key) {
            return Err(SyncError::Directory {
                key: key.to_string(),
                message: "HTTP 502".into(),
            });
        }
        if space != IdSpace::Device {
            return Ok(Vec::new());
        }
        Ok(self.online.lock().unwrap().get(key).cloned().unwrap_or_default())
    }

    async fn query_status(&self, _session: &Session, _key: &str) -> camsync_sync::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Session provider issuing `"{prefix}{n}"` tokens, with injectable failures.
pub struct StaticSessionProvider {
    prefix: String,
    rotate: bool,
    logins: AtomicUsize,
    failures: AtomicUsize,
}

impl StaticSessionProvider {
    /// Issue a new token on every login.
    pub fn rotating(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            rotate: true,
            logins: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Always issue the same token.
    pub fn fixed(token: &str) -> Self {
        Self {
            rotate: false,
            ..Self::rotating(token)
        }
    }

    /// Fail the next `n` login attempts.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Successful logins so far.
    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn login(&self, now: i64) -> camsync_sync::Result<Session> {
        let pending = self.failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures.store(pending - 1, Ordering::SeqCst);
            return Err(SyncError::Auth("result=Some(5) bad credentials".into()));
        }
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        let token = if self.rotate {
            format!("{}{}", self.prefix, n)
        } else {
            self.prefix.clone()
        };
        Ok(Session::new(token, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_sink_resolution_order() {
        let sink = ScriptedSink::new();
        sink.reject("bad", 500).push(SendOutcome::status(503));

        assert_eq!(sink.post(&[endpoint("ok")]).await.code(), Some(503));
        assert_eq!(sink.post(&[endpoint("ok"), endpoint("bad")]).await.code(), Some(500));
        assert!(sink.post(&[endpoint("ok")]).await.is_success());

        sink.set_down(true);
        assert!(matches!(sink.post(&[endpoint("ok")]).await, SendOutcome::Transport(_)));
        assert_eq!(sink.request_count(), 4);
    }

    #[tokio::test]
    async fn test_session_provider_failures_then_rotation() {
        let provider = StaticSessionProvider::rotating("JS");
        provider.fail_next(1);

        assert!(provider.login(0).await.is_err());
        assert_eq!(provider.login(1).await.unwrap().token(), "JS1");
        assert_eq!(provider.login(2).await.unwrap().token(), "JS2");
        assert_eq!(provider.login_count(), 2);
    }

    #[test]
    fn test_camera_map_fixture() {
        let map = camera_map(&[("K1", &[("Front", 0), ("Rear", 1)]), ("K2", &[("Cab", 2)])]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.channel_count(), 3);
    }
}
