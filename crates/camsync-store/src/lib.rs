//! # camsync Store
//!
//! Persistence for the delivery cache: the `name -> url` mapping of what was
//! last confirmed delivered to the sink.
//!
//! ## Overview
//!
//! The [`CacheStore`] trait keeps the sync loop storage-agnostic. The primary
//! implementation is [`JsonFileStore`], with [`MemoryStore`] for tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use camsync_store::{CacheStore, JsonFileStore};
//!
//! async fn example() {
//!     let store = JsonFileStore::new("last_sent.json");
//!
//!     // Missing or corrupt files load as an empty cache.
//!     let mut cache = store.load().await;
//!
//!     cache.insert("Cam1".into(), "rtmp://h/1".into());
//!     store.save(&cache).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Whole-file saves**: every save rewrites the full mapping
//! - **Atomic replace**: temp file + fsync + rename, so a crash leaves either
//!   the old or the new mapping on disk
//! - **Forgiving loads**: absence or corruption is an empty cache, never an error

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use traits::CacheStore;
