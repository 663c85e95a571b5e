//! # camsync Testkit
//!
//! Testing utilities for camsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: scriptable fakes for the platform ([`StaticSessionProvider`],
//!   [`StaticDirectory`]) and the sink ([`ScriptedSink`]), plus small helpers
//! - **Generators**: proptest strategies for snapshots, caches and outcomes
//!
//! ## Scripting a sink
//!
//! ```rust
//! use camsync_testkit::fixtures::{endpoint, ScriptedSink};
//! use camsync_sync::HttpSink;
//!
//! # tokio_test_block(async {
//! let sink = ScriptedSink::new();
//! sink.reject("Cam2", 500);
//!
//! assert!(sink.post(&[endpoint("Cam1")]).await.is_success());
//! assert!(!sink.post(&[endpoint("Cam1"), endpoint("Cam2")]).await.is_success());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```
//!
//! ## Property testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use camsync_testkit::generators::snapshot_and_cache;
//!
//! proptest! {
//!     #[test]
//!     fn diff_skips_known(input in snapshot_and_cache(20)) {
//!         let (snapshot, cache) = input;
//!         for ep in camsync_core::delta::diff(&snapshot, &cache) {
//!             prop_assert_ne!(cache.get(&ep.name), Some(&ep.url));
//!         }
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    camera_map, endpoint, fast_send_config, seeded_store, url_builder, ScriptedSink,
    StaticDirectory, StaticSessionProvider, TEST_HOST,
};
pub use generators::{send_outcome, snapshot_and_cache, stream_endpoint, unique_snapshot};
