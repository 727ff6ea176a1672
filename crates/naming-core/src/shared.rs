//! Shared types: data provenance tags, map identifiers, and the persisted key names.

use serde::{Deserialize, Serialize};

/// Data tagged with where it came from. Nothing in the naming layer throws to its
/// consumers; callers that care can tell fresh data from a cached fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sourced<T> {
    /// Fetched from the registry during this call.
    Fresh(T),
    /// Served from the in-memory or persisted cache.
    CachedFallback(T),
    /// Nothing available.
    Empty,
}

impl<T> Sourced<T> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_ref(&self) -> Sourced<&T> {
        match self {
            Self::Fresh(v) => Sourced::Fresh(v),
            Self::CachedFallback(v) => Sourced::CachedFallback(v),
            Self::Empty => Sourced::Empty,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Sourced<U> {
        match self {
            Self::Fresh(v) => Sourced::Fresh(f(v)),
            Self::CachedFallback(v) => Sourced::CachedFallback(f(v)),
            Self::Empty => Sourced::Empty,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Fresh(v) | Self::CachedFallback(v) => Some(v),
            Self::Empty => None,
        }
    }
}

impl<T: Default> Sourced<T> {
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

/// One of the persisted name maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapKind {
    NeuronNames,
    NeuronNicknames,
    Verified,
    PrincipalNames,
    PrincipalNicknames,
}

impl MapKind {
    /// Fixed merge order within one refresh.
    pub const ALL: [MapKind; 5] = [
        MapKind::NeuronNames,
        MapKind::NeuronNicknames,
        MapKind::Verified,
        MapKind::PrincipalNames,
        MapKind::PrincipalNicknames,
    ];

    /// Storage key (before namespacing).
    pub fn storage_key(&self) -> &'static str {
        match self {
            MapKind::NeuronNames => NEURON_NAMES_KEY,
            MapKind::NeuronNicknames => NEURON_NICKNAMES_KEY,
            MapKind::Verified => VERIFIED_NAMES_KEY,
            MapKind::PrincipalNames => PRINCIPAL_NAMES_KEY,
            MapKind::PrincipalNicknames => PRINCIPAL_NICKNAMES_KEY,
        }
    }
}

pub const NEURON_NAMES_KEY: &str = "neuron_names";
pub const NEURON_NICKNAMES_KEY: &str = "neuron_nicknames";
pub const VERIFIED_NAMES_KEY: &str = "verified_names";
pub const PRINCIPAL_NAMES_KEY: &str = "principal_names";
pub const PRINCIPAL_NICKNAMES_KEY: &str = "principal_nicknames";
pub const LAST_UPDATED_KEY: &str = "last_updated";

/// Every key the store writes, in persistence order.
pub const ALL_STORAGE_KEYS: [&str; 6] = [
    NEURON_NAMES_KEY,
    NEURON_NICKNAMES_KEY,
    VERIFIED_NAMES_KEY,
    PRINCIPAL_NAMES_KEY,
    PRINCIPAL_NICKNAMES_KEY,
    LAST_UPDATED_KEY,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sourced_accessors() {
        let fresh = Sourced::Fresh(3);
        assert!(fresh.is_fresh());
        assert_eq!(fresh.clone().map(|v| v * 2), Sourced::Fresh(6));
        let cached: Sourced<Vec<u8>> = Sourced::CachedFallback(vec![1]);
        assert!(!cached.is_fresh());
        assert_eq!(cached.into_option(), Some(vec![1]));
        let empty: Sourced<Vec<u8>> = Sourced::Empty;
        assert!(empty.is_empty());
        assert!(empty.unwrap_or_default().is_empty());
    }

    #[test]
    fn storage_keys_are_distinct() {
        let mut keys: Vec<&str> = MapKind::ALL.iter().map(|k| k.storage_key()).collect();
        keys.push(LAST_UPDATED_KEY);
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), ALL_STORAGE_KEYS.len());
    }
}
