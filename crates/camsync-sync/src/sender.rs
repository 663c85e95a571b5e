//! Resilient batch delivery.
//!
//! A delta is cut into small consecutive batches. Each batch goes through the
//! [`BatchStrategy`] first; the [`RetryPolicy`] then decides between success,
//! a whole-batch retry with backoff, a one-level split through the
//! [`SingletonFallbackStrategy`], or giving up.
//!
//! Items are reported delivered only when a request containing them was
//! answered 2xx. The caller folds exactly those into the cache.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use camsync_core::StreamEndpoint;

use crate::policy::{jittered, Decision, RetryPolicy};
use crate::transport::{HttpSink, SendOutcome};

/// Delivery configuration.
#[derive(Debug, Clone)]
pub struct SendConfig {
    /// Items per request. Kept small to bound the blast radius of a bad URL.
    pub batch_size: usize,
    /// Retry, backoff and fallback rules.
    pub retry: RetryPolicy,
    /// Log intent and report success without any network I/O.
    pub dry_run: bool,
    /// Politeness pause between batches (jittered).
    pub batch_pause: Duration,
    /// Pause between single-item sends during fallback (jittered).
    pub item_pause: Duration,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            retry: RetryPolicy::default(),
            dry_run: false,
            batch_pause: Duration::from_millis(500),
            item_pause: Duration::from_millis(250),
        }
    }
}

/// What a strategy achieved for one set of items.
#[derive(Debug, Clone, Default)]
pub struct StrategyOutcome {
    /// Items whose request was answered 2xx.
    pub delivered: Vec<StreamEndpoint>,
    /// Items that were not confirmed, with the outcome of their request.
    pub failed: Vec<(StreamEndpoint, SendOutcome)>,
}

/// One way of pushing a set of items through a sink.
#[async_trait]
pub trait SendStrategy: Send + Sync {
    async fn send(&self, sink: &dyn HttpSink, items: &[StreamEndpoint]) -> StrategyOutcome;
}

/// All items in a single request.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchStrategy;

impl BatchStrategy {
    /// Send once and return the raw outcome alongside the split result.
    pub async fn send_once(
        &self,
        sink: &dyn HttpSink,
        items: &[StreamEndpoint],
    ) -> (SendOutcome, StrategyOutcome) {
        let outcome = sink.post(items).await;
        let split = if outcome.is_success() {
            StrategyOutcome {
                delivered: items.to_vec(),
                failed: Vec::new(),
            }
        } else {
            StrategyOutcome {
                delivered: Vec::new(),
                failed: items.iter().cloned().map(|ep| (ep, outcome.clone())).collect(),
            }
        };
        (outcome, split)
    }
}

#[async_trait]
impl SendStrategy for BatchStrategy {
    async fn send(&self, sink: &dyn HttpSink, items: &[StreamEndpoint]) -> StrategyOutcome {
        self.send_once(sink, items).await.1
    }
}

/// One request per item, no retries. Isolates which item the sink rejects.
#[derive(Debug, Clone, Default)]
pub struct SingletonFallbackStrategy {
    /// Pause between item requests (jittered).
    pub item_pause: Duration,
}

impl SingletonFallbackStrategy {
    pub fn new(item_pause: Duration) -> Self {
        Self { item_pause }
    }
}

#[async_trait]
impl SendStrategy for SingletonFallbackStrategy {
    async fn send(&self, sink: &dyn HttpSink, items: &[StreamEndpoint]) -> StrategyOutcome {
        let mut result = StrategyOutcome::default();

        for (i, item) in items.iter().enumerate() {
            if i > 0 && !self.item_pause.is_zero() {
                tokio::time::sleep(jittered(self.item_pause)).await;
            }

            let outcome = sink.post(std::slice::from_ref(item)).await;
            if outcome.is_success() {
                debug!(name = %item.name, %outcome, "item delivered");
                result.delivered.push(item.clone());
            } else {
                warn!(name = %item.name, %outcome, "item rejected");
                result.failed.push((item.clone(), outcome));
            }
        }

        result
    }
}

/// Result of sending one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Items confirmed 2xx, in batch order.
    pub delivered: Vec<StreamEndpoint>,
    /// Items not confirmed, with the last outcome seen for each.
    pub failed: Vec<(StreamEndpoint, SendOutcome)>,
    /// Whole-batch requests issued (fallback requests not counted).
    pub attempts: u32,
    /// Whether the batch was split into single-item requests.
    pub fell_back: bool,
}

impl BatchReport {
    /// Every item in the batch was confirmed.
    pub fn fully_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of sending a whole delta.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub batches: Vec<BatchReport>,
}

impl DeliveryReport {
    /// Confirmed items across all batches, in delta order.
    pub fn delivered(&self) -> impl Iterator<Item = &StreamEndpoint> {
        self.batches.iter().flat_map(|b| b.delivered.iter())
    }

    pub fn delivered_count(&self) -> usize {
        self.batches.iter().map(|b| b.delivered.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.batches.iter().map(|b| b.failed.len()).sum()
    }
}

/// Sends deltas to a sink in ordered batches with retry and fallback.
pub struct BatchSender<K: HttpSink> {
    sink: K,
    config: SendConfig,
    batch: BatchStrategy,
    fallback: SingletonFallbackStrategy,
}

impl<K: HttpSink> BatchSender<K> {
    pub fn new(sink: K, config: SendConfig) -> Self {
        let fallback = SingletonFallbackStrategy::new(config.item_pause);
        Self {
            sink,
            config,
            batch: BatchStrategy,
            fallback,
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn config(&self) -> &SendConfig {
        &self.config
    }

    /// Consecutive batches of at most `batch_size` items (minimum 1).
    pub fn batches<'a>(&self, items: &'a [StreamEndpoint]) -> std::slice::Chunks<'a, StreamEndpoint> {
        items.chunks(self.config.batch_size.max(1))
    }

    /// Send one batch, applying retry, backoff and fallback.
    pub async fn send_batch(&self, items: &[StreamEndpoint]) -> BatchReport {
        if items.is_empty() {
            return BatchReport::default();
        }

        if self.config.dry_run {
            info!(count = items.len(), "dry run: would POST set_urls");
            for item in items {
                debug!(name = %item.name, url = %item.url, "dry run item");
            }
            return BatchReport {
                delivered: items.to_vec(),
                ..BatchReport::default()
            };
        }

        let policy = &self.config.retry;
        let mut attempt = 0u32;

        loop {
            let (outcome, split) = self.batch.send_once(&self.sink, items).await;
            let attempts = attempt + 1;

            match policy.classify(&outcome, attempt, items.len()) {
                Decision::Delivered => {
                    info!(count = items.len(), %outcome, "batch delivered");
                    return BatchReport {
                        delivered: split.delivered,
                        failed: split.failed,
                        attempts,
                        fell_back: false,
                    };
                }
                Decision::Fallback => {
                    warn!(count = items.len(), %outcome, "batch failed, falling back to per-item sends");
                    let single = self.fallback.send(&self.sink, items).await;
                    info!(
                        delivered = single.delivered.len(),
                        failed = single.failed.len(),
                        "fallback finished"
                    );
                    return BatchReport {
                        delivered: single.delivered,
                        failed: single.failed,
                        attempts,
                        fell_back: true,
                    };
                }
                Decision::Retry { retry } => {
                    let delay = policy.delay(retry);
                    warn!(
                        count = items.len(),
                        %outcome,
                        retry = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "batch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Decision::GiveUp => {
                    warn!(count = items.len(), %outcome, attempts, "batch failed, giving up");
                    return BatchReport {
                        delivered: split.delivered,
                        failed: split.failed,
                        attempts,
                        fell_back: false,
                    };
                }
            }
        }
    }

    /// Send a whole delta in order, pausing between batches.
    ///
    /// `on_batch` sees every batch report as soon as it is known, so callers
    /// can fold confirmed items into their cache incrementally.
    pub async fn send_all<F>(&self, items: &[StreamEndpoint], mut on_batch: F) -> DeliveryReport
    where
        F: FnMut(&BatchReport) + Send,
    {
        let mut report = DeliveryReport::default();

        for (i, batch) in self.batches(items).enumerate() {
            if i > 0 && !self.config.batch_pause.is_zero() {
                tokio::time::sleep(jittered(self.config.batch_pause)).await;
            }
            let batch_report = self.send_batch(batch).await;
            on_batch(&batch_report);
            report.batches.push(batch_report);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemorySink;

    fn ep(name: &str) -> StreamEndpoint {
        StreamEndpoint::new(name, format!("rtmp://h/{name}"))
    }

    fn fast_config() -> SendConfig {
        SendConfig {
            batch_size: 3,
            retry: RetryPolicy {
                max_retry: 2,
                initial_backoff: Duration::ZERO,
                backoff_cap: Duration::ZERO,
                fallback_split: true,
            },
            dry_run: false,
            batch_pause: Duration::ZERO,
            item_pause: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_batch_delivered_first_try() {
        let sender = BatchSender::new(MemorySink::accepting(), fast_config());
        let items = vec![ep("a"), ep("b"), ep("c")];

        let report = sender.send_batch(&items).await;
        assert!(report.fully_delivered());
        assert_eq!(report.delivered, items);
        assert_eq!(report.attempts, 1);
        assert_eq!(sender.sink().request_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_isolates_bad_item() {
        // Any request containing "b" fails with 500.
        let sink = MemorySink::new(|items| {
            if items.iter().any(|i| i.name == "b") {
                SendOutcome::status(500)
            } else {
                SendOutcome::status(200)
            }
        });
        let sender = BatchSender::new(sink, fast_config());

        let report = sender.send_batch(&[ep("a"), ep("b"), ep("c")]).await;

        assert!(report.fell_back);
        assert!(!report.fully_delivered());
        assert_eq!(report.delivered, vec![ep("a"), ep("c")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, ep("b"));
        assert_eq!(report.failed[0].1.code(), Some(500));
        // One batch request plus three singles, no retries of the singles.
        assert_eq!(sender.sink().request_count(), 4);
    }

    #[tokio::test]
    async fn test_single_item_retries_then_gives_up() {
        let sender = BatchSender::new(MemorySink::new(|_| SendOutcome::status(503)), fast_config());

        let report = sender.send_batch(&[ep("a")]).await;

        assert!(report.delivered.is_empty());
        assert_eq!(report.attempts, 3);
        assert_eq!(sender.sink().request_count(), 3);
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let sink = MemorySink::new(move |_| {
            if calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                SendOutcome::Transport("connection reset".into())
            } else {
                SendOutcome::status(200)
            }
        });
        let sender = BatchSender::new(sink, fast_config());

        let report = sender.send_batch(&[ep("a")]).await;
        assert!(report.fully_delivered());
        assert_eq!(report.attempts, 2);
    }

    #[tokio::test]
    async fn test_client_error_not_retried_or_split() {
        let sender = BatchSender::new(MemorySink::new(|_| SendOutcome::status(400)), fast_config());

        let report = sender.send_batch(&[ep("a"), ep("b")]).await;

        assert!(report.delivered.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(!report.fell_back);
        assert_eq!(sender.sink().request_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_disabled_retries_whole_batch() {
        let mut config = fast_config();
        config.retry.fallback_split = false;
        let sender = BatchSender::new(MemorySink::new(|_| SendOutcome::status(502)), config);

        let report = sender.send_batch(&[ep("a"), ep("b")]).await;

        assert!(!report.fell_back);
        assert_eq!(report.attempts, 3);
        assert!(sender.sink().requests().iter().all(|r| r.len() == 2));
    }

    #[tokio::test]
    async fn test_dry_run_skips_network() {
        let mut config = fast_config();
        config.dry_run = true;
        let sender = BatchSender::new(MemorySink::new(|_| SendOutcome::status(500)), config);

        let report = sender.send_batch(&[ep("a"), ep("b")]).await;
        assert!(report.fully_delivered());
        assert_eq!(sender.sink().request_count(), 0);
    }

    #[tokio::test]
    async fn test_send_all_batches_in_order() {
        let sender = BatchSender::new(MemorySink::accepting(), fast_config());
        let items: Vec<_> = ["a", "b", "c", "d", "e", "f", "g"].iter().map(|n| ep(n)).collect();

        let mut seen = Vec::new();
        let report = sender
            .send_all(&items, |b| seen.extend(b.delivered.iter().cloned()))
            .await;

        let sizes: Vec<_> = sender.sink().requests().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(seen, items);
        assert_eq!(report.delivered_count(), 7);
        assert_eq!(report.failed_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_batch_size_treated_as_one() {
        let mut config = fast_config();
        config.batch_size = 0;
        let sender = BatchSender::new(MemorySink::accepting(), config);

        sender.send_all(&[ep("a"), ep("b")], |_| {}).await;
        assert_eq!(sender.sink().request_count(), 2);
    }
}
