//! # camsync
//!
//! Keeps a downstream stream-URL endpoint in sync with the cameras that are
//! online on a CMSV8 video platform.
//!
//! ## Overview
//!
//! Every scan interval the daemon:
//!
//! - logs in to the platform when the session is missing or stale
//! - asks which devices of each camera-map group are online
//! - builds one stream URL per (device, channel)
//! - diffs that snapshot against the cache of URLs the endpoint already has
//! - POSTs only the delta, in small batches with retry and per-item fallback
//! - folds confirmed items into the cache and writes it atomically
//!
//! ## Usage
//!
//! ```rust,no_run
//! use camsync::{build, Config};
//!
//! async fn example() -> camsync::Result<()> {
//!     let config = Config::from_env()?;
//!     let camera_map = config.load_camera_map()?;
//!
//!     let mut sync_loop = build(&config, camera_map).await?;
//!     sync_loop.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `camsync::core` - endpoints, sessions, naming, URLs, delta
//! - `camsync::store` - cache persistence
//! - `camsync::sync` - collection, delivery policy, batch sending

pub mod cmsv8;
pub mod config;
pub mod daemon;
pub mod error;
pub mod sink;

pub use camsync_core as core;
pub use camsync_store as store;
pub use camsync_sync as sync;

pub use cmsv8::CmsClient;
pub use config::{CmsConfig, Config, Secret};
pub use daemon::{
    build, now_millis, CmsSyncLoop, CycleOutcome, CycleReport, LoopConfig, PersistOutcome,
    SyncLoop,
};
pub use error::{CamsyncError, Result};
pub use sink::HttpSinkClient;
