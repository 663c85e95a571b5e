//! Delta computation between a snapshot and the delivery cache.
//!
//! Both functions are pure. The loop calls [`diff`] once per cycle and
//! [`apply`] once per confirmed batch.

use crate::types::{Cache, StreamEndpoint};

/// Endpoints whose url is new or differs from the cache, in snapshot order.
pub fn diff(snapshot: &[StreamEndpoint], cache: &Cache) -> Vec<StreamEndpoint> {
    snapshot
        .iter()
        .filter(|ep| cache.get(&ep.name) != Some(&ep.url))
        .cloned()
        .collect()
}

/// Record delivered endpoints in the cache. Later entries win on name clashes.
pub fn apply(cache: &mut Cache, delivered: &[StreamEndpoint]) {
    for ep in delivered {
        cache.insert(ep.name.clone(), ep.url.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ep(name: &str, url: &str) -> StreamEndpoint {
        StreamEndpoint::new(name, url)
    }

    #[test]
    fn test_diff_new_and_changed() {
        let snapshot = vec![ep("a", "1"), ep("b", "2"), ep("c", "3")];
        let mut cache = Cache::new();
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "old".into());

        let delta = diff(&snapshot, &cache);
        assert_eq!(delta, vec![ep("b", "2"), ep("c", "3")]);
    }

    #[test]
    fn test_diff_empty_snapshot() {
        let mut cache = Cache::new();
        cache.insert("a".into(), "1".into());
        assert!(diff(&[], &cache).is_empty());
    }

    #[test]
    fn test_stale_entries_untouched() {
        let mut cache = Cache::new();
        cache.insert("gone".into(), "x".into());

        apply(&mut cache, &[ep("a", "1")]);
        assert_eq!(cache.get("gone").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_apply_last_write_wins() {
        let mut cache = Cache::new();
        apply(&mut cache, &[ep("a", "1"), ep("a", "2")]);
        assert_eq!(cache.get("a").map(String::as_str), Some("2"));
    }

    fn endpoints() -> impl Strategy<Value = Vec<StreamEndpoint>> {
        prop::collection::vec(("[a-e]", "[0-3]"), 0..20)
            .prop_map(|pairs| pairs.into_iter().map(|(n, u)| ep(&n, &u)).collect())
    }

    fn cache() -> impl Strategy<Value = Cache> {
        prop::collection::btree_map("[a-e]", "[0-3]", 0..5)
    }

    /// Snapshots with unique names, as produced by the collector.
    fn unique_endpoints() -> impl Strategy<Value = Vec<StreamEndpoint>> {
        prop::collection::btree_map("[a-h]", "[0-3]", 0..8)
            .prop_map(|m| m.into_iter().map(|(n, u)| ep(&n, &u)).collect())
    }

    proptest! {
        #[test]
        fn test_rediff_after_apply_is_empty(snapshot in unique_endpoints(), mut c in cache()) {
            let delta = diff(&snapshot, &c);
            apply(&mut c, &delta);
            prop_assert!(diff(&snapshot, &c).is_empty());
        }

        #[test]
        fn test_diff_is_ordered_subsequence(snapshot in endpoints(), c in cache()) {
            let delta = diff(&snapshot, &c);

            let mut rest = snapshot.iter();
            for item in &delta {
                prop_assert!(rest.any(|s| s == item));
            }
        }

        #[test]
        fn test_diff_excludes_cached(snapshot in endpoints(), c in cache()) {
            for item in diff(&snapshot, &c) {
                prop_assert_ne!(c.get(&item.name), Some(&item.url));
            }
        }
    }
}
