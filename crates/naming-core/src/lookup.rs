//! Synchronous lookups over the in-memory maps. Not found is never an error.

use crate::catalog::{catalog_principal_names, CollectiveCatalogEntry};
use crate::keys::{NeuronKey, PrincipalKey};
use crate::maps::{NameMap, NamingMapSet};

const SHORT_ID_HEAD: usize = 5;
const SHORT_ID_TAIL: usize = 3;
const SHORT_ID_ELLIPSIS: &str = "-...-";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeuronNaming {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub verified: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalNaming {
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub verified: Option<bool>,
}

pub fn lookup_neuron(maps: &NamingMapSet, fingerprint_hex: &str, collective_id: &str) -> NeuronNaming {
    let Ok(key) = NeuronKey::new(collective_id, fingerprint_hex) else {
        return NeuronNaming::default();
    };
    let key = key.to_string();
    NeuronNaming {
        name: maps.neuron_names.get(&key).cloned(),
        nickname: maps.neuron_nicknames.get(&key).cloned(),
        verified: maps.verified.get(&key).copied(),
    }
}

/// `overlay` is the output of [`principal_overlay`].
pub fn lookup_principal(maps: &NamingMapSet, overlay: &NameMap, id: &str) -> PrincipalNaming {
    let Ok(key) = PrincipalKey::new(id) else {
        return PrincipalNaming::default();
    };
    let key = key.as_str();
    PrincipalNaming {
        name: overlay.get(key).cloned(),
        nickname: maps.principal_nicknames.get(key).cloned(),
        verified: maps.verified.get(key).copied(),
    }
}

/// Registry principal names overlaid on catalog-derived labels. Registry wins ties.
pub fn principal_overlay(maps: &NamingMapSet, catalog: &[CollectiveCatalogEntry]) -> NameMap {
    let mut overlay = catalog_principal_names(catalog);
    for (k, v) in &maps.principal_names {
        overlay.insert(k.clone(), v.clone());
    }
    overlay
}

/// `abcde-...-xyz` form of a long id; ids no longer than the shortened form are returned as is.
pub fn shorten_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= SHORT_ID_HEAD + SHORT_ID_TAIL + SHORT_ID_ELLIPSIS.len() {
        return id.to_string();
    }
    let head: String = chars[..SHORT_ID_HEAD].iter().collect();
    let tail: String = chars[chars.len() - SHORT_ID_TAIL..].iter().collect();
    format!("{}{}{}", head, SHORT_ID_ELLIPSIS, tail)
}

fn compose(nickname: Option<&str>, name: Option<&str>, verified: bool, fallback: &str) -> String {
    let nickname = nickname.map(str::trim).filter(|s| !s.is_empty());
    let name = name.map(str::trim).filter(|s| !s.is_empty());
    let name = name.map(|n| if verified { format!("{} ✓", n) } else { n.to_string() });
    match (nickname, name) {
        (Some(nick), Some(name)) => format!("{} ({})", nick, name),
        (Some(nick), None) => nick.to_string(),
        (None, Some(name)) => name,
        (None, None) => shorten_id(fallback),
    }
}

/// Label shown for a neuron: nickname, public name, or the shortened fingerprint.
pub fn display_name_for_neuron(naming: &NeuronNaming, fingerprint_hex: &str) -> String {
    compose(
        naming.nickname.as_deref(),
        naming.name.as_deref(),
        naming.verified.unwrap_or(false),
        fingerprint_hex,
    )
}

/// Label shown for a principal: nickname, overlay name, or the shortened id.
pub fn display_name_for_principal(naming: &PrincipalNaming, id: &str) -> String {
    compose(
        naming.nickname.as_deref(),
        naming.name.as_deref(),
        naming.verified.unwrap_or(false),
        id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn maps() -> NamingMapSet {
        let mut m = NamingMapSet::default();
        m.neuron_names.insert("sns1:aa".into(), "Alice".into());
        m.verified.insert("sns1:aa".into(), true);
        m.neuron_nicknames.insert("sns1:aa".into(), "ally".into());
        m.principal_names.insert("abc-123".into(), "RegistryName".into());
        m
    }

    fn catalog() -> Vec<CollectiveCatalogEntry> {
        vec![CollectiveCatalogEntry {
            name: "Catalog".into(),
            governance: Some("abc-123".into()),
            ledger: Some("led-9".into()),
            ..Default::default()
        }]
    }

    #[test]
    fn neuron_lookup_hits_and_misses() {
        let m = maps();
        let hit = lookup_neuron(&m, "AA", "sns1");
        assert_eq!(hit.name.as_deref(), Some("Alice"));
        assert_eq!(hit.nickname.as_deref(), Some("ally"));
        assert_eq!(hit.verified, Some(true));
        assert_eq!(lookup_neuron(&m, "bb", "sns1"), NeuronNaming::default());
        assert_eq!(lookup_neuron(&m, "not-hex", "sns1"), NeuronNaming::default());
    }

    #[test]
    fn registry_name_beats_catalog() {
        let m = maps();
        let overlay = principal_overlay(&m, &catalog());
        assert_eq!(lookup_principal(&m, &overlay, "abc-123").name.as_deref(), Some("RegistryName"));
        assert_eq!(lookup_principal(&m, &overlay, "led-9").name.as_deref(), Some("Catalog Ledger"));
        assert_eq!(lookup_principal(&m, &overlay, "zzz").name, None);
    }

    #[test]
    fn display_names() {
        let m = maps();
        let n = lookup_neuron(&m, "aa", "sns1");
        assert_eq!(display_name_for_neuron(&n, "aa"), "ally (Alice ✓)");
        let missing = PrincipalNaming::default();
        assert_eq!(
            display_name_for_principal(&missing, "rrkah-fqaaa-aaaaa-aaaaq-cai"),
            "rrkah-...-cai"
        );
        assert_eq!(shorten_id("short"), "short");
        assert_eq!(shorten_id("abcdefghijklm"), "abcdefghijklm");
        assert_eq!(shorten_id("abcdefghijklmn"), "abcde-...-lmn");
    }
}
