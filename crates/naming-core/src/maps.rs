//! The five name maps and the per-refresh deltas merged into them.

use crate::keys::{NeuronKey, PrincipalKey};
use crate::merge::{merge_with_stats, MergeStats};
use crate::registry::{RawNeuronName, RawNeuronNickname, RawPrincipalName, RawPrincipalNickname};
use crate::shared::MapKind;
use crate::snapshot_store::SnapshotStore;
use std::collections::BTreeMap;
use tracing::debug;

pub type NameMap = BTreeMap<String, String>;
pub type VerifiedMap = BTreeMap<String, bool>;

/// Every name the client knows. Keys are [`crate::CompositeKey`] storage strings.
///
/// `verified` holds both neuron keys (`"<collective>:<hex>"`) and principal ids. Principal
/// rows whose id contains the delimiter are skipped, so the two key spaces stay disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingMapSet {
    pub neuron_names: NameMap,
    pub neuron_nicknames: NameMap,
    pub verified: VerifiedMap,
    pub principal_names: NameMap,
    pub principal_nicknames: NameMap,
}

impl NamingMapSet {
    /// Seeds the maps from persisted snapshots. Missing or corrupt snapshots give empty maps.
    pub fn load(store: &SnapshotStore) -> Self {
        Self {
            neuron_names: store.load(MapKind::NeuronNames.storage_key()).unwrap_or_default(),
            neuron_nicknames: store.load(MapKind::NeuronNicknames.storage_key()).unwrap_or_default(),
            verified: store.load(MapKind::Verified.storage_key()).unwrap_or_default(),
            principal_names: store.load(MapKind::PrincipalNames.storage_key()).unwrap_or_default(),
            principal_nicknames: store.load(MapKind::PrincipalNicknames.storage_key()).unwrap_or_default(),
        }
    }

    /// Writes one map. Returns false if the store refused the write.
    pub fn persist(&self, store: &SnapshotStore, kind: MapKind) -> bool {
        let key = kind.storage_key();
        match kind {
            MapKind::NeuronNames => store.save(key, &self.neuron_names),
            MapKind::NeuronNicknames => store.save(key, &self.neuron_nicknames),
            MapKind::Verified => store.save(key, &self.verified),
            MapKind::PrincipalNames => store.save(key, &self.principal_names),
            MapKind::PrincipalNicknames => store.save(key, &self.principal_nicknames),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len_of(MapKind::NeuronNames) == 0
            && self.len_of(MapKind::NeuronNicknames) == 0
            && self.len_of(MapKind::Verified) == 0
            && self.len_of(MapKind::PrincipalNames) == 0
            && self.len_of(MapKind::PrincipalNicknames) == 0
    }

    pub fn len_of(&self, kind: MapKind) -> usize {
        match kind {
            MapKind::NeuronNames => self.neuron_names.len(),
            MapKind::NeuronNicknames => self.neuron_nicknames.len(),
            MapKind::Verified => self.verified.len(),
            MapKind::PrincipalNames => self.principal_names.len(),
            MapKind::PrincipalNicknames => self.principal_nicknames.len(),
        }
    }

    /// Merges a delta into a copy of these maps, in [`MapKind::ALL`] order.
    /// Nickname maps are left as they are when the delta carries none.
    pub fn apply(&self, delta: &NamingDelta) -> (Self, Vec<(MapKind, MergeStats)>) {
        let mut next = self.clone();
        let mut stats = Vec::with_capacity(MapKind::ALL.len());
        for kind in MapKind::ALL {
            let s = match kind {
                MapKind::NeuronNames => {
                    let (m, s) = merge_with_stats(&self.neuron_names, &delta.neuron_names);
                    next.neuron_names = m;
                    s
                }
                MapKind::NeuronNicknames => match &delta.neuron_nicknames {
                    Some(d) => {
                        let (m, s) = merge_with_stats(&self.neuron_nicknames, d);
                        next.neuron_nicknames = m;
                        s
                    }
                    None => continue,
                },
                MapKind::Verified => {
                    let (m, s) = merge_with_stats(&self.verified, &delta.verified);
                    next.verified = m;
                    s
                }
                MapKind::PrincipalNames => {
                    let (m, s) = merge_with_stats(&self.principal_names, &delta.principal_names);
                    next.principal_names = m;
                    s
                }
                MapKind::PrincipalNicknames => match &delta.principal_nicknames {
                    Some(d) => {
                        let (m, s) = merge_with_stats(&self.principal_nicknames, d);
                        next.principal_nicknames = m;
                        s
                    }
                    None => continue,
                },
            };
            stats.push((kind, s));
        }
        (next, stats)
    }
}

/// Normalized rows from one refresh. `None` nickname deltas mean "not fetched" (anonymous caller).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingDelta {
    pub neuron_names: NameMap,
    pub neuron_nicknames: Option<NameMap>,
    pub verified: VerifiedMap,
    pub principal_names: NameMap,
    pub principal_nicknames: Option<NameMap>,
    /// Rows dropped because their key did not normalize.
    pub skipped: usize,
}

impl NamingDelta {
    pub fn from_rows(
        neuron_names: Vec<RawNeuronName>,
        neuron_nicknames: Option<Vec<RawNeuronNickname>>,
        principal_names: Vec<RawPrincipalName>,
        principal_nicknames: Option<Vec<RawPrincipalNickname>>,
    ) -> Self {
        let mut delta = Self::default();

        for row in neuron_names {
            match NeuronKey::new(&row.collective_id, &row.fingerprint_hex) {
                Ok(key) => {
                    let key = key.to_string();
                    delta.verified.insert(key.clone(), row.verified);
                    delta.neuron_names.insert(key, row.name);
                }
                Err(e) => delta.skip("neuron name", &e),
            }
        }

        if let Some(rows) = neuron_nicknames {
            let mut out = NameMap::new();
            for row in rows {
                match NeuronKey::new(&row.collective_id, &row.fingerprint_hex) {
                    Ok(key) => {
                        out.insert(key.to_string(), row.nickname);
                    }
                    Err(e) => delta.skip("neuron nickname", &e),
                }
            }
            delta.neuron_nicknames = Some(out);
        }

        for row in principal_names {
            match PrincipalKey::new(&row.principal) {
                Ok(key) => {
                    let key = key.to_string();
                    delta.verified.insert(key.clone(), row.verified);
                    delta.principal_names.insert(key, row.name);
                }
                Err(e) => delta.skip("principal name", &e),
            }
        }

        if let Some(rows) = principal_nicknames {
            let mut out = NameMap::new();
            for row in rows {
                match PrincipalKey::new(&row.principal) {
                    Ok(key) => {
                        out.insert(key.to_string(), row.nickname);
                    }
                    Err(e) => delta.skip("principal nickname", &e),
                }
            }
            delta.principal_nicknames = Some(out);
        }

        delta
    }

    fn skip(&mut self, what: &str, err: &crate::keys::KeyError) {
        self.skipped += 1;
        debug!(row = what, error = %err, "skipping registry row with malformed key");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neuron_row(c: &str, h: &str, name: &str, verified: bool) -> RawNeuronName {
        RawNeuronName {
            collective_id: c.into(),
            fingerprint_hex: h.into(),
            name: name.into(),
            verified,
        }
    }

    #[test]
    fn delta_splits_name_and_verified() {
        let delta = NamingDelta::from_rows(
            vec![neuron_row("sns1", "AA", "Alice", true), neuron_row("bad:id", "aa", "x", false)],
            None,
            vec![RawPrincipalName {
                principal: "abc-123".into(),
                name: "Treasury".into(),
                verified: false,
            }],
            None,
        );
        assert_eq!(delta.neuron_names["sns1:aa"], "Alice");
        assert!(delta.verified["sns1:aa"]);
        assert!(!delta.verified["abc-123"]);
        assert_eq!(delta.principal_names["abc-123"], "Treasury");
        assert!(delta.neuron_nicknames.is_none());
        assert_eq!(delta.skipped, 1);
    }

    #[test]
    fn principal_row_cannot_overwrite_neuron_verified_flag() {
        let delta = NamingDelta::from_rows(
            vec![neuron_row("sns1", "aa", "Alice", true)],
            None,
            vec![RawPrincipalName {
                principal: "sns1:aa".into(),
                name: "Impostor".into(),
                verified: false,
            }],
            None,
        );
        assert_eq!(delta.skipped, 1);
        assert!(delta.principal_names.is_empty());

        let (next, _) = NamingMapSet::default().apply(&delta);
        assert_eq!(next.verified.get("sns1:aa"), Some(&true));
        assert_eq!(next.neuron_names["sns1:aa"], "Alice");
    }

    #[test]
    fn apply_keeps_nicknames_when_not_fetched() {
        let mut maps = NamingMapSet::default();
        maps.neuron_nicknames.insert("sns1:bb".into(), "mine".into());
        let delta = NamingDelta::from_rows(vec![neuron_row("sns1", "aa", "Alice", true)], None, vec![], None);
        let (next, stats) = maps.apply(&delta);
        assert_eq!(next.neuron_nicknames, maps.neuron_nicknames);
        assert_eq!(next.neuron_names["sns1:aa"], "Alice");
        let kinds: Vec<MapKind> = stats.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![MapKind::NeuronNames, MapKind::Verified, MapKind::PrincipalNames]);
    }

    #[test]
    fn load_and_persist_roundtrip() {
        let store = SnapshotStore::in_memory("t").unwrap();
        let mut maps = NamingMapSet::default();
        maps.principal_names.insert("abc-123".into(), "Registry".into());
        maps.verified.insert("abc-123".into(), true);
        for kind in MapKind::ALL {
            assert!(maps.persist(&store, kind));
        }
        assert_eq!(NamingMapSet::load(&store), maps);
    }
}
