//! Naming cache configuration.
//!
//! Precedence: env `NAMING_CONFIG` path > `config/naming.toml` > defaults, then
//! `NAMING__*` environment variables on top (e.g. `NAMING__REGISTRY_URL`).

use crate::search::DEFAULT_SEARCH_LIMIT;
use crate::snapshot_store::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

/// | Key | Default | Description |
/// |-----|---------|-------------|
/// | storage_path | ./data/naming | Sled directory for the snapshots. |
/// | namespace | naming | Prefix for every persisted key. |
/// | registry_url | http://127.0.0.1:8080 | Base URL of the naming registry. |
/// | request_timeout_secs | 30 | Per-request registry timeout. |
/// | refresh_interval_secs | 300 | Background refresh period (daemon). |
/// | catalog_path | (none) | JSON file with collective catalog entries. |
/// | search_limit | 20 | Maximum search hits. |
/// | caller | (none) | Caller identity for nickname queries. Anonymous when unset. |
/// | snapshot_quota_bytes | (none) | Largest single snapshot the store accepts. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    pub storage_path: String,
    pub namespace: String,
    pub registry_url: String,
    pub request_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    #[serde(default)]
    pub catalog_path: Option<String>,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default)]
    pub caller: Option<String>,
    #[serde(default)]
    pub snapshot_quota_bytes: Option<usize>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            storage_path: "./data/naming".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            registry_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            refresh_interval_secs: 300,
            catalog_path: None,
            search_limit: DEFAULT_SEARCH_LIMIT,
            caller: None,
            snapshot_quota_bytes: None,
        }
    }
}

impl NamingConfig {
    /// Load config from file and environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("NAMING_CONFIG").unwrap_or_else(|_| "config/naming.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let d = Self::default();
        let builder = config::Config::builder()
            .set_default("storage_path", d.storage_path)?
            .set_default("namespace", d.namespace)?
            .set_default("registry_url", d.registry_url)?
            .set_default("request_timeout_secs", d.request_timeout_secs as i64)?
            .set_default("refresh_interval_secs", d.refresh_interval_secs as i64)?
            .set_default("search_limit", d.search_limit as i64)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("NAMING").separator("__"))
            .build()?;

        let mut cfg: Self = built.try_deserialize()?;
        cfg.caller = cfg.caller.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
        cfg.refresh_interval_secs = cfg.refresh_interval_secs.max(1);
        Ok(cfg)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("naming.toml");
        std::fs::write(
            &path,
            "registry_url = \"http://registry.local\"\nsearch_limit = 5\ncaller = \"  \"\nsnapshot_quota_bytes = 4096\n",
        )
        .unwrap();
        let cfg = NamingConfig::load_from(&path).unwrap();
        assert_eq!(cfg.registry_url, "http://registry.local");
        assert_eq!(cfg.search_limit, 5);
        assert_eq!(cfg.namespace, DEFAULT_NAMESPACE);
        assert_eq!(cfg.caller, None);
        assert_eq!(cfg.snapshot_quota_bytes, Some(4096));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let cfg = NamingConfig::load_from(Path::new("/nonexistent/naming.toml")).unwrap();
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(300));
        assert_eq!(cfg.search_limit, DEFAULT_SEARCH_LIMIT);
        assert_eq!(cfg.snapshot_quota_bytes, None);
    }
}
