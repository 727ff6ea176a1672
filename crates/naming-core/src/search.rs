//! Ranked search over the name maps, for autocomplete inputs.
//!
//! Tiers, best first: exact, prefix, substring (each split verified name > nickname >
//! unverified name), then a raw-id substring match used only when nothing else matched.

use crate::keys::{NeuronKey, KEY_DELIMITER};
use crate::maps::{NameMap, NamingMapSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Which maps a search reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    PrivateOnly,
    PublicOnly,
    #[default]
    Combined,
}

impl SearchMode {
    fn names(self) -> bool {
        !matches!(self, SearchMode::PrivateOnly)
    }

    fn nicknames(self) -> bool {
        !matches!(self, SearchMode::PublicOnly)
    }
}

/// Match quality. Declaration order is ascending rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    RawIdSubstring,
    UnverifiedNameSubstring,
    NicknameSubstring,
    VerifiedNameSubstring,
    UnverifiedNamePrefix,
    NicknamePrefix,
    VerifiedNamePrefix,
    UnverifiedNameExact,
    NicknameExact,
    VerifiedNameExact,
}

impl MatchTier {
    pub fn score(self) -> u8 {
        self as u8 + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Storage key (`"<collective>:<hex>"` for neurons, raw id for principals).
    pub key: String,
    /// Fingerprint hex for neurons, principal id for principals.
    pub id: String,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub verified: bool,
    pub tier: MatchTier,
}

#[derive(Clone, Copy)]
enum Matched {
    Exact,
    Prefix,
    Substring,
}

fn text_match(haystack: &str, needle_lower: &str) -> Option<Matched> {
    let h = haystack.trim().to_lowercase();
    if h.is_empty() {
        return None;
    }
    if h == needle_lower {
        Some(Matched::Exact)
    } else if h.starts_with(needle_lower) {
        Some(Matched::Prefix)
    } else if h.contains(needle_lower) {
        Some(Matched::Substring)
    } else {
        None
    }
}

fn name_tier(m: Matched, verified: bool) -> MatchTier {
    match (m, verified) {
        (Matched::Exact, true) => MatchTier::VerifiedNameExact,
        (Matched::Exact, false) => MatchTier::UnverifiedNameExact,
        (Matched::Prefix, true) => MatchTier::VerifiedNamePrefix,
        (Matched::Prefix, false) => MatchTier::UnverifiedNamePrefix,
        (Matched::Substring, true) => MatchTier::VerifiedNameSubstring,
        (Matched::Substring, false) => MatchTier::UnverifiedNameSubstring,
    }
}

fn nickname_tier(m: Matched) -> MatchTier {
    match m {
        Matched::Exact => MatchTier::NicknameExact,
        Matched::Prefix => MatchTier::NicknamePrefix,
        Matched::Substring => MatchTier::NicknameSubstring,
    }
}

struct Candidate<'a> {
    key: &'a str,
    id: &'a str,
    name: Option<&'a String>,
    nickname: Option<&'a String>,
    verified: bool,
}

fn score(c: &Candidate<'_>, needle: &str) -> Option<MatchTier> {
    let by_name = c.name.and_then(|n| text_match(n, needle)).map(|m| name_tier(m, c.verified));
    let by_nick = c.nickname.and_then(|n| text_match(n, needle)).map(nickname_tier);
    let best = by_name.max(by_nick);
    if best.is_some() {
        return best;
    }
    if c.id.to_lowercase().contains(needle) {
        return Some(MatchTier::RawIdSubstring);
    }
    None
}

fn rank(mut hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    // Stable: equal tiers keep key order.
    hits.sort_by(|a, b| b.tier.cmp(&a.tier));
    hits.truncate(limit);
    hits
}

/// Searches neurons of one collective. Capped at [`DEFAULT_SEARCH_LIMIT`].
pub fn search_neurons(maps: &NamingMapSet, query: &str, collective_id: &str, mode: SearchMode) -> Vec<SearchHit> {
    search_neurons_with_limit(maps, query, collective_id, mode, DEFAULT_SEARCH_LIMIT)
}

pub fn search_neurons_with_limit(
    maps: &NamingMapSet,
    query: &str,
    collective_id: &str,
    mode: SearchMode,
    limit: usize,
) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() || limit == 0 {
        return Vec::new();
    }
    let prefix = format!("{}{}", collective_id.trim(), KEY_DELIMITER);

    let mut keys: BTreeSet<&str> = BTreeSet::new();
    if mode.names() {
        keys.extend(maps.neuron_names.keys().map(String::as_str).filter(|k| k.starts_with(&prefix)));
    }
    if mode.nicknames() {
        keys.extend(maps.neuron_nicknames.keys().map(String::as_str).filter(|k| k.starts_with(&prefix)));
    }

    let mut hits = Vec::new();
    for key in keys {
        let Ok(parsed) = NeuronKey::parse(key) else {
            continue;
        };
        let c = Candidate {
            key,
            id: parsed.fingerprint_hex(),
            name: mode.names().then(|| maps.neuron_names.get(key)).flatten(),
            nickname: mode.nicknames().then(|| maps.neuron_nicknames.get(key)).flatten(),
            verified: maps.verified.get(key).copied().unwrap_or(false),
        };
        if let Some(tier) = score(&c, &needle) {
            hits.push(to_hit(&c, tier));
        }
    }
    rank(hits, limit)
}

/// Searches principals. `overlay` is the registry-over-catalog name view.
pub fn search_principals(maps: &NamingMapSet, overlay: &NameMap, query: &str, mode: SearchMode) -> Vec<SearchHit> {
    search_principals_with_limit(maps, overlay, query, mode, DEFAULT_SEARCH_LIMIT)
}

pub fn search_principals_with_limit(
    maps: &NamingMapSet,
    overlay: &NameMap,
    query: &str,
    mode: SearchMode,
    limit: usize,
) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() || limit == 0 {
        return Vec::new();
    }
    let mut keys: BTreeSet<&str> = BTreeSet::new();
    if mode.names() {
        keys.extend(overlay.keys().map(String::as_str));
    }
    if mode.nicknames() {
        keys.extend(maps.principal_nicknames.keys().map(String::as_str));
    }

    let mut hits = Vec::new();
    for key in keys {
        let c = Candidate {
            key,
            id: key,
            name: mode.names().then(|| overlay.get(key)).flatten(),
            nickname: mode.nicknames().then(|| maps.principal_nicknames.get(key)).flatten(),
            verified: maps.verified.get(key).copied().unwrap_or(false),
        };
        if let Some(tier) = score(&c, &needle) {
            hits.push(to_hit(&c, tier));
        }
    }
    rank(hits, limit)
}

fn to_hit(c: &Candidate<'_>, tier: MatchTier) -> SearchHit {
    SearchHit {
        key: c.key.to_string(),
        id: c.id.to_string(),
        name: c.name.cloned(),
        nickname: c.nickname.cloned(),
        verified: c.verified,
        tier,
    }
}
