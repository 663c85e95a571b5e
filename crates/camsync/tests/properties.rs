//! Property tests over the delivery policy, the delta engine and batching.

use std::time::Duration;

use proptest::prelude::*;

use camsync_core::{delta, Cache};
use camsync_sync::{classify, BatchSender, Decision, RetryPolicy, SendOutcome};
use camsync_testkit::{
    fast_send_config, send_outcome, snapshot_and_cache, stream_endpoint, unique_snapshot, ScriptedSink,
};

fn policy(max_retry: u32, fallback_split: bool) -> RetryPolicy {
    RetryPolicy {
        max_retry,
        initial_backoff: Duration::ZERO,
        backoff_cap: Duration::ZERO,
        fallback_split,
    }
}

proptest! {
    #[test]
    fn classify_puts_every_outcome_in_its_bucket(
        outcome in send_outcome(),
        attempt in 0u32..5,
        batch_len in 1usize..6,
        max_retry in 0u32..4,
        fallback_split in any::<bool>(),
    ) {
        let policy = policy(max_retry, fallback_split);
        let decision = classify(&outcome, attempt, batch_len, &policy);

        let retryable = match &outcome {
            SendOutcome::Transport(_) => true,
            SendOutcome::Status { code, .. } => (500..600).contains(code),
        };

        if outcome.is_success() {
            prop_assert_eq!(decision, Decision::Delivered);
        } else if !retryable {
            prop_assert_eq!(decision, Decision::GiveUp);
        } else if batch_len > 1 && fallback_split {
            prop_assert_eq!(decision, Decision::Fallback);
        } else if attempt < max_retry {
            prop_assert_eq!(decision, Decision::Retry { retry: attempt });
        } else {
            prop_assert_eq!(decision, Decision::GiveUp);
        }
    }

    #[test]
    fn diff_excludes_known_and_keeps_order(input in snapshot_and_cache(24)) {
        let (snapshot, cache) = input;
        let pending = delta::diff(&snapshot, &cache);

        for ep in &pending {
            prop_assert_ne!(cache.get(&ep.name), Some(&ep.url));
        }
        let mut rest = snapshot.iter();
        for ep in &pending {
            prop_assert!(rest.any(|s| s == ep), "delta is not an ordered subsequence");
        }
        let expected = snapshot
            .iter()
            .filter(|ep| cache.get(&ep.name) != Some(&ep.url))
            .count();
        prop_assert_eq!(pending.len(), expected);
    }

    #[test]
    fn empty_cache_sends_whole_snapshot(snapshot in unique_snapshot(24)) {
        prop_assert_eq!(delta::diff(&snapshot, &Cache::new()), snapshot);
    }

    #[test]
    fn diff_is_empty_after_applying_delta(input in snapshot_and_cache(24)) {
        let (snapshot, mut cache) = input;
        let pending = delta::diff(&snapshot, &cache);

        delta::apply(&mut cache, &pending);

        prop_assert!(delta::diff(&snapshot, &cache).is_empty());
    }

    #[test]
    fn batches_cover_the_delta_in_order(
        items in prop::collection::vec(stream_endpoint(), 0..12),
        batch_size in 1usize..5,
    ) {
        let mut config = fast_send_config();
        config.batch_size = batch_size;
        let sender = BatchSender::new(ScriptedSink::new(), config);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        let report = runtime.block_on(sender.send_all(&items, |_| {}));

        let requests = sender.sink().requests();
        prop_assert!(requests.iter().all(|r| !r.is_empty() && r.len() <= batch_size));
        let sent: Vec<_> = requests.into_iter().flatten().collect();
        prop_assert_eq!(&sent, &items);
        prop_assert_eq!(report.delivered().cloned().collect::<Vec<_>>(), items);
    }
}
