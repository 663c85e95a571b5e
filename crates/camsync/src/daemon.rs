//! The sync loop: login, collect, diff, send, persist, idle.
//!
//! [`SyncLoop`] owns the in-memory cache and the current session. Each call
//! to [`SyncLoop::run_cycle`] performs one pass and reports what happened;
//! [`SyncLoop::run`] repeats that forever with `scan_interval` sleeps.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info, warn};

use camsync_core::{delta, Cache, CameraMap, Session, Snapshot, StreamEndpoint, StreamUrlBuilder, UrlBuilder};
use camsync_store::{CacheStore, JsonFileStore};
use camsync_sync::{
    BatchSender, CollectReport, DeviceDirectory, HttpSink, LoginReason, SessionProvider,
    SessionSlot, SnapshotCollector, SyncError,
};

use crate::cmsv8::CmsClient;
use crate::config::Config;
use crate::error::Result;
use crate::sink::HttpSinkClient;

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Loop timing and session rules.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub scan_interval: Duration,
    pub session_max_age: Duration,
    pub startup_grace: Duration,
    pub always_login: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(20),
            session_max_age: Duration::from_secs(1200),
            startup_grace: Duration::ZERO,
            always_login: false,
        }
    }
}

impl From<&Config> for LoopConfig {
    fn from(config: &Config) -> Self {
        Self {
            scan_interval: config.scan_interval,
            session_max_age: config.session_max_age,
            startup_grace: config.startup_grace,
            always_login: config.always_login,
        }
    }
}

/// What the send phase of a cycle achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No usable session; nothing else ran.
    LoginFailed(String),
    /// Every directory query failed; the session is kept.
    CollectFailed(String),
    /// The sink already has everything in the snapshot.
    NoChanges { endpoints: usize },
    /// A delta was sent.
    Sent {
        delta: usize,
        delivered: usize,
        failed: usize,
    },
}

/// Whether the cache was written this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Nothing new to save.
    Skipped,
    Saved,
    /// Save failed; deliveries stay in memory and are flushed next time.
    Failed(String),
}

/// Result of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Why a login happened, if one did.
    pub login: Option<LoginReason>,
    pub outcome: CycleOutcome,
    pub persist: PersistOutcome,
}

/// The long-running synchronization loop.
pub struct SyncLoop<P, D, U, K, S>
where
    P: SessionProvider,
    D: DeviceDirectory,
    U: UrlBuilder,
    K: HttpSink,
    S: CacheStore,
{
    provider: P,
    collector: SnapshotCollector<D, U>,
    sender: BatchSender<K>,
    store: S,
    config: LoopConfig,
    slot: SessionSlot,
    cache: Cache,
    /// In-memory cache holds deliveries that are not on disk yet.
    dirty: bool,
    cycles: u64,
}

impl<P, D, U, K, S> SyncLoop<P, D, U, K, S>
where
    P: SessionProvider,
    D: DeviceDirectory,
    U: UrlBuilder,
    K: HttpSink,
    S: CacheStore,
{
    /// Create the loop and load the persisted cache.
    pub async fn new(
        provider: P,
        collector: SnapshotCollector<D, U>,
        sender: BatchSender<K>,
        store: S,
        config: LoopConfig,
    ) -> Self {
        let cache = store.load().await;
        info!(entries = cache.len(), "cache loaded");
        let slot = SessionSlot::new(config.session_max_age, config.always_login);
        Self {
            provider,
            collector,
            sender,
            store,
            config,
            slot,
            cache,
            dirty: false,
            cycles: 0,
        }
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn session(&self) -> Option<&Session> {
        self.slot.current()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn collector(&self) -> &SnapshotCollector<D, U> {
        &self.collector
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sender(&self) -> &BatchSender<K> {
        &self.sender
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Whether the in-memory cache is ahead of the persisted one.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// One pass: send only what changed since the last confirmed delivery.
    pub async fn run_cycle(&mut self, now: i64) -> CycleReport {
        self.cycle(now, false).await
    }

    /// One pass that ignores the cache and sends the whole snapshot.
    pub async fn resend_all(&mut self, now: i64) -> CycleReport {
        self.cycle(now, true).await
    }

    /// Log in if needed and collect, without sending anything.
    pub async fn snapshot(&mut self, now: i64) -> std::result::Result<CollectReport, SyncError> {
        self.ensure_session(now).await?;
        let Some(session) = self.slot.current() else {
            return Err(SyncError::Auth("no session".into()));
        };
        self.collector.collect(session).await
    }

    /// Run cycles forever, sleeping `scan_interval` after each.
    pub async fn run(&mut self) {
        if !self.config.startup_grace.is_zero() {
            info!(grace_secs = self.config.startup_grace.as_secs_f64(), "startup grace period");
            tokio::time::sleep(self.config.startup_grace).await;
        }

        loop {
            self.run_cycle(now_millis()).await;
            tokio::time::sleep(self.config.scan_interval).await;
        }
    }

    async fn cycle(&mut self, now: i64, full: bool) -> CycleReport {
        self.cycles += 1;
        let mut report = CycleReport {
            cycle: self.cycles,
            login: None,
            outcome: CycleOutcome::NoChanges { endpoints: 0 },
            persist: PersistOutcome::Skipped,
        };

        match self.ensure_session(now).await {
            Ok(reason) => report.login = reason,
            Err(e) => {
                error!(cycle = report.cycle, error = %e, "login failed, retrying next cycle");
                report.login = self.slot.needs_login(now);
                report.outcome = CycleOutcome::LoginFailed(e.to_string());
                report.persist = self.persist(0).await;
                return report;
            }
        }
        let Some(session) = self.slot.current() else {
            report.outcome = CycleOutcome::LoginFailed("no session".into());
            return report;
        };

        let snapshot = match self.collector.collect(session).await {
            Ok(collected) => collected.snapshot,
            Err(e) => {
                error!(cycle = report.cycle, error = %e, "snapshot collection failed");
                report.outcome = CycleOutcome::CollectFailed(e.to_string());
                report.persist = self.persist(0).await;
                return report;
            }
        };

        if snapshot.is_empty() {
            info!(cycle = report.cycle, "no device online");
        } else {
            self.log_stale(&snapshot);
        }

        let pending = if full {
            snapshot.clone()
        } else {
            delta::diff(&snapshot, &self.cache)
        };

        if pending.is_empty() {
            if !snapshot.is_empty() {
                info!(cycle = report.cycle, endpoints = snapshot.len(), "no changes, skipping send");
            }
            report.outcome = CycleOutcome::NoChanges {
                endpoints: snapshot.len(),
            };
            report.persist = self.persist(0).await;
            return report;
        }

        let (delivered, failed) = self.send(&pending).await;
        if delivered > 0 {
            info!(cycle = report.cycle, sent = delivered, total = pending.len(), "delta delivered");
        } else {
            warn!(cycle = report.cycle, total = pending.len(), "no delta item was delivered this cycle");
        }

        report.outcome = CycleOutcome::Sent {
            delta: pending.len(),
            delivered,
            failed,
        };
        report.persist = self.persist(delivered).await;
        report
    }

    /// Log in when the slot says so. Returns the reason if a login happened.
    async fn ensure_session(&mut self, now: i64) -> std::result::Result<Option<LoginReason>, SyncError> {
        let Some(reason) = self.slot.needs_login(now) else {
            return Ok(None);
        };

        let session = self.provider.login(now).await?;
        let token = session.redacted();
        let changed = self.slot.replace(session);
        info!(?reason, %token, changed, "logged in");
        Ok(Some(reason))
    }

    /// Send `items` in batches, folding each confirmed item into the cache.
    async fn send(&mut self, items: &[StreamEndpoint]) -> (usize, usize) {
        let cache = &mut self.cache;
        let report = self
            .sender
            .send_all(items, |batch| delta::apply(cache, &batch.delivered))
            .await;

        for batch in &report.batches {
            for (item, outcome) in &batch.failed {
                debug!(name = %item.name, %outcome, "item not confirmed");
            }
        }
        (report.delivered_count(), report.failed_count())
    }

    async fn persist(&mut self, delivered: usize) -> PersistOutcome {
        if delivered > 0 {
            self.dirty = true;
        }
        if !self.dirty {
            return PersistOutcome::Skipped;
        }

        match self.store.save(&self.cache).await {
            Ok(()) => {
                self.dirty = false;
                debug!(entries = self.cache.len(), "cache saved");
                PersistOutcome::Saved
            }
            Err(e) => {
                error!(error = %e, "cache save failed, will retry next cycle");
                PersistOutcome::Failed(e.to_string())
            }
        }
    }

    /// Cached names that are no longer in the snapshot are kept, only logged.
    fn log_stale(&self, snapshot: &Snapshot) {
        let live: HashSet<&str> = snapshot.iter().map(|e| e.name.as_str()).collect();
        let stale = self.cache.keys().filter(|k| !live.contains(k.as_str())).count();
        if stale > 0 {
            debug!(stale, "cached entries not in current snapshot");
        }
    }
}

/// The loop wired to the CMSV8 platform, the HTTP sink and the JSON cache.
pub type CmsSyncLoop = SyncLoop<CmsClient, CmsClient, StreamUrlBuilder, HttpSinkClient, JsonFileStore>;

/// Build the production loop from configuration.
pub async fn build(config: &Config, camera_map: CameraMap) -> Result<CmsSyncLoop> {
    let cms = CmsClient::new(&config.cms)?;
    let url_builder = StreamUrlBuilder::new(config.cms.scheme, config.cms.host.clone(), config.cms.port);
    let collector = SnapshotCollector::new(cms.clone(), url_builder, camera_map)
        .with_naming(config.naming)
        .with_stream(config.cms.stream)
        .with_concurrency(config.collect_concurrency);
    let sink = HttpSinkClient::new(config.endpoint_url.clone(), config.post_timeout)?;
    let sender = BatchSender::new(sink, config.send.clone());
    let store = JsonFileStore::new(&config.cache_path);

    Ok(SyncLoop::new(cms, collector, sender, store, LoopConfig::from(config)).await)
}
