//! # camsync Sync
//!
//! Snapshot collection and resilient delivery of stream URLs.
//!
//! ## Overview
//!
//! One sync pass looks like this:
//!
//! ```text
//! SessionProvider ──► SnapshotCollector ──► delta::diff ──► BatchSender ──► HttpSink
//!   (login)            (DeviceDirectory      (camsync-core)   (RetryPolicy,
//!                       + UrlBuilder)                          strategies)
//! ```
//!
//! ## Key Properties
//!
//! - **Per-group isolation**: one failing directory lookup never empties the
//!   whole snapshot
//! - **Precise confirmation**: an item counts as delivered only when a request
//!   containing it was answered 2xx
//! - **Bounded blast radius**: small batches, and a failing batch can be split
//!   into single-item requests to isolate the bad URL
//! - **Explicit policy**: retry / fallback / give-up is a pure function of the
//!   outcome, attempt number and batch size
//!
//! ## Usage
//!
//! ```rust
//! use camsync_core::StreamEndpoint;
//! use camsync_sync::{BatchSender, SendConfig, MemorySink};
//!
//! async fn example() {
//!     let sender = BatchSender::new(MemorySink::accepting(), SendConfig::default());
//!     let delta = vec![StreamEndpoint::new("Cam1", "rtmp://h/1")];
//!
//!     let report = sender.send_all(&delta, |_| {}).await;
//!     assert_eq!(report.delivered_count(), 1);
//! }
//! ```

pub mod collector;
pub mod error;
pub mod policy;
pub mod sender;
pub mod session;
pub mod transport;

pub use collector::{CollectReport, DeviceDirectory, IdSpace, SnapshotCollector};
pub use error::{Result, SyncError};
pub use policy::{classify, jittered, Decision, FailureKind, RetryPolicy, JITTER_FRACTION};
pub use sender::{
    BatchReport, BatchSender, BatchStrategy, DeliveryReport, SendConfig, SendStrategy,
    SingletonFallbackStrategy, StrategyOutcome,
};
pub use session::{LoginReason, SessionProvider, SessionSlot};
pub use transport::{memory::MemorySink, HttpSink, SendOutcome, SetUrls, BODY_LOG_LIMIT};
