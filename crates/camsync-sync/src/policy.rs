//! Delivery policy: what to do after a send, and how long to wait.
//!
//! [`classify`] is a pure function over (outcome, attempt, batch size) so the
//! retry / fallback / give-up decision can be tested without any I/O.
//!
//! | outcome | batch > 1 and fallback on | otherwise |
//! |---|---|---|
//! | 2xx | `Delivered` | `Delivered` |
//! | 5xx or transport error | `Fallback` | `Retry` until attempts run out, then `GiveUp` |
//! | anything else (1xx, 3xx, 4xx) | `GiveUp` | `GiveUp` |

use std::time::Duration;

use rand::Rng;

use crate::transport::SendOutcome;

/// Maximum jitter added on top of a wait, as a fraction of the wait.
pub const JITTER_FRACTION: f64 = 0.35;

/// How a failed outcome should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Server-side or transport failure. Worth retrying or splitting.
    Retryable,
    /// The request itself is wrong. Resending it unchanged cannot help.
    Terminal,
}

impl FailureKind {
    /// `None` for 2xx.
    pub fn of(outcome: &SendOutcome) -> Option<FailureKind> {
        match outcome {
            SendOutcome::Transport(_) => Some(FailureKind::Retryable),
            SendOutcome::Status { code, .. } => match code {
                200..=299 => None,
                500..=599 => Some(FailureKind::Retryable),
                _ => Some(FailureKind::Terminal),
            },
        }
    }
}

/// Next step after one batch send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Every item in the batch was accepted.
    Delivered,
    /// Resend the batch item by item to isolate the bad one.
    Fallback,
    /// Resend the whole batch after backing off. Carries the retry number
    /// (0 for the first retry).
    Retry { retry: u32 },
    /// Stop; nothing in the batch was delivered.
    GiveUp,
}

/// Retry and backoff configuration, applied uniformly to every batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Additional whole-batch attempts after the first.
    pub max_retry: u32,
    /// Wait before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any single wait (before jitter).
    pub backoff_cap: Duration,
    /// Whether a failing multi-item batch may be split into single sends.
    pub fallback_split: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry: 1,
            initial_backoff: Duration::from_millis(800),
            backoff_cap: Duration::from_secs(5),
            fallback_split: true,
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after the `attempt`-th send (0-based) of a batch.
    pub fn classify(&self, outcome: &SendOutcome, attempt: u32, batch_len: usize) -> Decision {
        classify(outcome, attempt, batch_len, self)
    }

    /// Wait before retry number `retry`: `min(initial * 2^retry, cap)`.
    pub fn base_delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.backoff_cap)
            .min(self.backoff_cap)
    }

    /// [`base_delay`](Self::base_delay) plus up to 35% jitter.
    pub fn delay(&self, retry: u32) -> Duration {
        jittered(self.base_delay(retry))
    }
}

/// Pure retry / fallback / give-up classification.
pub fn classify(outcome: &SendOutcome, attempt: u32, batch_len: usize, policy: &RetryPolicy) -> Decision {
    match FailureKind::of(outcome) {
        None => Decision::Delivered,
        Some(FailureKind::Terminal) => Decision::GiveUp,
        Some(FailureKind::Retryable) if batch_len > 1 && policy.fallback_split => Decision::Fallback,
        Some(FailureKind::Retryable) if attempt < policy.max_retry => Decision::Retry { retry: attempt },
        Some(FailureKind::Retryable) => Decision::GiveUp,
    }
}

/// `base` plus a uniform random extra of up to [`JITTER_FRACTION`] of `base`.
pub fn jittered(base: Duration) -> Duration {
    if base.is_zero() {
        return base;
    }
    let extra = rand::thread_rng().gen_range(0.0..=JITTER_FRACTION);
    base + base.mul_f64(extra)
}
