//! # camsync Core
//!
//! Pure primitives for camsync: stream endpoints, naming, URL construction,
//! and delta computation against the delivery cache.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! deterministic computation over plain values.
//!
//! ## Key Types
//!
//! - [`StreamEndpoint`] - A named stream-playback URL
//! - [`Cache`] - The last successfully delivered `name -> url` mapping
//! - [`Session`] - A time-bounded authentication token
//! - [`CameraMap`] - Group key to channel layout configuration
//! - [`NamingMode`] - How endpoint names are derived
//!
//! ## Delta computation
//!
//! ```rust
//! use camsync_core::{delta, Cache, StreamEndpoint};
//!
//! let snapshot = vec![StreamEndpoint::new("Cam1", "rtmp://h/1")];
//! let mut cache = Cache::new();
//!
//! let changed = delta::diff(&snapshot, &cache);
//! assert_eq!(changed.len(), 1);
//!
//! delta::apply(&mut cache, &changed);
//! assert!(delta::diff(&snapshot, &cache).is_empty());
//! ```

pub mod camera_map;
pub mod delta;
pub mod error;
pub mod naming;
pub mod types;
pub mod url;

pub use camera_map::{CameraGroup, CameraMap, ChannelSpec};
pub use error::{CoreError, Result};
pub use naming::{safe_name, NamingMode};
pub use types::{Cache, Session, Snapshot, StreamEndpoint};
pub use url::{StreamScheme, StreamUrlBuilder, UrlBuilder};
