//! Proptest generators for property-based testing.

use proptest::prelude::*;

use camsync_core::{Cache, Snapshot, StreamEndpoint};
use camsync_sync::SendOutcome;

/// Display-name-like strings, including the odd double space.
pub fn endpoint_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 /()-]{0,24}"
}

/// Stream URLs in the CMSV8 shape.
pub fn stream_url() -> impl Strategy<Value = String> {
    ("[a-z0-9]{1,12}", "[A-Z0-9]{1,8}", 0u32..16, 0u32..2).prop_map(|(token, device, ch, stream)| {
        format!(
            "rtmp://cms.test:6604/3/3?AVType=1&jsession={token}&DevIDNO={device}&Channel={ch}&Stream={stream}"
        )
    })
}

pub fn stream_endpoint() -> impl Strategy<Value = StreamEndpoint> {
    (endpoint_name(), stream_url()).prop_map(|(name, url)| StreamEndpoint { name, url })
}

/// Snapshots of up to `max` endpoints with unique names.
pub fn unique_snapshot(max: usize) -> impl Strategy<Value = Snapshot> {
    prop::collection::btree_map(endpoint_name(), stream_url(), 0..=max).prop_flat_map(|entries| {
        let snapshot: Snapshot = entries
            .into_iter()
            .map(|(name, url)| StreamEndpoint { name, url })
            .collect();
        Just(snapshot).prop_shuffle()
    })
}

/// A snapshot plus a cache that agrees with a random subset of it and holds
/// some unrelated entries.
pub fn snapshot_and_cache(max: usize) -> impl Strategy<Value = (Snapshot, Cache)> {
    unique_snapshot(max).prop_flat_map(|snapshot| {
        let len = snapshot.len();
        (
            Just(snapshot),
            prop::collection::vec(any::<bool>(), len),
            prop::collection::btree_map("zz[a-z]{1,6}", stream_url(), 0..4),
        )
            .prop_map(|(snapshot, known, extra)| {
                let mut cache: Cache = extra;
                for (ep, keep) in snapshot.iter().zip(known) {
                    if keep {
                        cache.insert(ep.name.clone(), ep.url.clone());
                    }
                }
                (snapshot, cache)
            })
    })
}

/// Sink outcomes across every classification bucket.
pub fn send_outcome() -> impl Strategy<Value = SendOutcome> {
    prop_oneof![
        (200u16..300).prop_map(SendOutcome::status),
        (300u16..500).prop_map(SendOutcome::status),
        (500u16..600).prop_map(SendOutcome::status),
        "[a-z ]{1,20}".prop_map(SendOutcome::Transport),
    ]
}
