//! Collective catalog: organizational metadata maintained outside the naming registry.
//!
//! The naming layer only reads it. Entries are turned into synthesized principal
//! labels ("{name} Governance", ...) that back the principal-name overlay.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info};

const SIGNAL_CAPACITY: usize = 16;

/// One collective and the principal ids of its sub-entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectiveCatalogEntry {
    pub name: String,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub governance: Option<String>,
    #[serde(default)]
    pub ledger: Option<String>,
    #[serde(default)]
    pub swap: Option<String>,
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub dapps: Vec<String>,
    #[serde(default)]
    pub archives: Vec<String>,
}

impl CollectiveCatalogEntry {
    /// (principal id, role label) pairs in role order.
    pub fn role_ids(&self) -> Vec<(&str, &'static str)> {
        let singles = [
            (&self.root, "Root"),
            (&self.governance, "Governance"),
            (&self.ledger, "Ledger"),
            (&self.swap, "Swap"),
            (&self.index, "Index"),
        ];
        let mut out: Vec<(&str, &'static str)> = singles
            .into_iter()
            .filter_map(|(id, role)| id.as_deref().map(|id| (id, role)))
            .collect();
        out.extend(self.dapps.iter().map(|id| (id.as_str(), "Dapp")));
        out.extend(self.archives.iter().map(|id| (id.as_str(), "Archive")));
        out
    }
}

/// Fired by [`CatalogCache`] whenever its entries are replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogUpdated {
    pub entries: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog read: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog parse: {0}")]
    Parse(#[from] serde_json::Error),
}

/// In-process catalog with explicit observer registration.
pub struct CatalogCache {
    entries: RwLock<Arc<Vec<CollectiveCatalogEntry>>>,
    tx: broadcast::Sender<CatalogUpdated>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl CatalogCache {
    pub fn new(entries: Vec<CollectiveCatalogEntry>) -> Self {
        let (tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            entries: RwLock::new(Arc::new(entries)),
            tx,
        }
    }

    /// Reads a JSON array of entries.
    pub fn load_json_file(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        let entries: Vec<CollectiveCatalogEntry> = serde_json::from_str(&text)?;
        info!(path = %path.display(), entries = entries.len(), "collective catalog loaded");
        Ok(Self::new(entries))
    }

    pub fn get_all(&self) -> Arc<Vec<CollectiveCatalogEntry>> {
        match self.entries.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replaces all entries and notifies observers.
    pub fn replace_all(&self, entries: Vec<CollectiveCatalogEntry>) {
        let count = entries.len();
        match self.entries.write() {
            Ok(mut guard) => *guard = Arc::new(entries),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(entries),
        }
        if self.tx.send(CatalogUpdated { entries: count }).is_err() {
            debug!(entries = count, "catalog updated with no observers registered");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogUpdated> {
        self.tx.subscribe()
    }
}

/// Synthesized principal -> label map. The first entry claiming an id wins.
pub fn catalog_principal_names(entries: &[CollectiveCatalogEntry]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for entry in entries {
        let name = entry.name.trim();
        if name.is_empty() {
            continue;
        }
        for (id, role) in entry.role_ids() {
            let id = id.trim();
            if id.is_empty() {
                continue;
            }
            out.entry(id.to_string()).or_insert_with(|| format!("{} {}", name, role));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> CollectiveCatalogEntry {
        CollectiveCatalogEntry {
            name: "Catalog".into(),
            root: Some("root-1".into()),
            governance: Some("abc-123".into()),
            ledger: Some("ledger-1".into()),
            dapps: vec!["dapp-1".into()],
            archives: vec!["arch-1".into()],
            ..Default::default()
        }
    }

    #[test]
    fn synthesizes_role_labels() {
        let names = catalog_principal_names(&[entry()]);
        assert_eq!(names["abc-123"], "Catalog Governance");
        assert_eq!(names["root-1"], "Catalog Root");
        assert_eq!(names["dapp-1"], "Catalog Dapp");
        assert_eq!(names["arch-1"], "Catalog Archive");
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn first_claim_wins() {
        let mut other = entry();
        other.name = "Other".into();
        let names = catalog_principal_names(&[entry(), other]);
        assert_eq!(names["abc-123"], "Catalog Governance");
    }

    #[test]
    fn replace_all_notifies() {
        let cache = CatalogCache::default();
        let mut rx = cache.subscribe();
        cache.replace_all(vec![entry()]);
        assert_eq!(rx.try_recv().unwrap(), CatalogUpdated { entries: 1 });
        assert_eq!(cache.get_all().len(), 1);
    }

    #[test]
    fn parses_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, r#"[{"name":"Alpha","governance":"gov-1","dapps":["d-1"]}]"#).unwrap();
        let cache = CatalogCache::load_json_file(&path).unwrap();
        assert_eq!(cache.get_all()[0].governance.as_deref(), Some("gov-1"));
    }
}
