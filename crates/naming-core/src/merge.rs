//! Merge of a cached map with a freshly fetched one.
//!
//! New values win; keys missing from the fresh map are kept. Names are never
//! removed by a refresh, only added or changed.

use std::collections::BTreeMap;

/// Counts of what a merge did, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub added: usize,
    pub changed: usize,
    pub unchanged: usize,
}

/// Returns a new map: a copy of `old` with every entry of `new` written over it.
pub fn merge_maps<V: Clone>(
    old: &BTreeMap<String, V>,
    new: &BTreeMap<String, V>,
) -> BTreeMap<String, V> {
    let mut merged = old.clone();
    for (k, v) in new {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

/// Same as [`merge_maps`], also reporting how many keys were added or changed.
pub fn merge_with_stats<V: Clone + PartialEq>(
    old: &BTreeMap<String, V>,
    new: &BTreeMap<String, V>,
) -> (BTreeMap<String, V>, MergeStats) {
    let mut stats = MergeStats::default();
    for (k, v) in new {
        match old.get(k) {
            None => stats.added += 1,
            Some(prev) if prev != v => stats.changed += 1,
            Some(_) => stats.unchanged += 1,
        }
    }
    (merge_maps(old, new), stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn new_overrides_and_old_survives() {
        let a = map(&[("x", "1"), ("y", "2")]);
        let b = map(&[("y", "3"), ("z", "4")]);
        let m = merge_maps(&a, &b);
        assert_eq!(m, map(&[("x", "1"), ("y", "3"), ("z", "4")]));
        // inputs untouched
        assert_eq!(a, map(&[("x", "1"), ("y", "2")]));
    }

    #[test]
    fn idempotent_on_reapply() {
        let a = map(&[("x", "1"), ("y", "2")]);
        let b = map(&[("y", "3")]);
        let once = merge_maps(&a, &b);
        assert_eq!(merge_maps(&once, &b), once);
    }

    #[test]
    fn empty_value_still_overwrites() {
        let a = map(&[("x", "Alice")]);
        let b = map(&[("x", "")]);
        assert_eq!(merge_maps(&a, &b)["x"], "");
    }

    #[test]
    fn stats_count_changes() {
        let a = map(&[("x", "1"), ("y", "2")]);
        let b = map(&[("x", "1"), ("y", "5"), ("z", "9")]);
        let (_, stats) = merge_with_stats(&a, &b);
        assert_eq!(stats, MergeStats { added: 1, changed: 1, unchanged: 1 });
    }
}
