//! Naming cache daemon.
//!
//! Keeps the persisted name maps warm: seeds from the snapshot store, refreshes from the
//! naming registry on a fixed interval, and reloads the collective catalog file when its
//! modification time changes (the service recomputes the principal overlay on reload).

use naming_core::{
    CallerIdentity, CatalogCache, HttpNamingRegistry, NamingConfig, NamingEvent, NamingService, RefreshOutcome,
    SnapshotStore,
};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[naming-daemon] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match NamingConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid naming config");
            std::process::exit(1);
        }
    };

    // NOTE: sled is single-writer; two daemons must not share a storage path.
    let store = match SnapshotStore::open_path(&config.storage_path, &config.namespace) {
        Ok(s) => match config.snapshot_quota_bytes {
            Some(quota) => s.with_quota(quota),
            None => s,
        },
        Err(e) => {
            tracing::error!(error = %e, path = %config.storage_path, "cannot open snapshot store");
            std::process::exit(1);
        }
    };

    let catalog = Arc::new(load_catalog(config.catalog_path.as_deref()));
    let mut catalog_mtime = catalog_modified(config.catalog_path.as_deref());

    let registry = Arc::new(HttpNamingRegistry::new(&config.registry_url, config.request_timeout()));
    let caller = config.caller.clone().map(CallerIdentity);
    let service = NamingService::with_search_limit(
        registry,
        store,
        Arc::clone(&catalog),
        caller,
        config.search_limit,
    );
    service.watch_catalog();

    let mut events = service.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(NamingEvent::RefreshFailed { generation }) => {
                    tracing::debug!(generation, "refresh failure observed");
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!(skipped = n, "event listener lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tracing::info!(
        registry = %config.registry_url,
        storage_path = %config.storage_path,
        refresh_interval_secs = config.refresh_interval_secs,
        "naming daemon started"
    );

    let mode = service.init().await;
    tracing::info!(mode = ?mode, "initial refresh scheduled");

    let mut interval = tokio::time::interval(config.refresh_interval());
    // First tick fires immediately; init already covered it.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let modified = catalog_modified(config.catalog_path.as_deref());
                if modified != catalog_mtime {
                    catalog_mtime = modified;
                    let fresh = load_catalog(config.catalog_path.as_deref());
                    catalog.replace_all(fresh.get_all().as_ref().clone());
                }
                log_outcome(&service.refresh_all(true).await);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down naming daemon");
                break;
            }
        }
    }

    service.dispose();
}

fn load_catalog(path: Option<&str>) -> CatalogCache {
    let Some(path) = path else {
        return CatalogCache::default();
    };
    match CatalogCache::load_json_file(Path::new(path)) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, path, "catalog not loaded; overlay uses registry names only");
            CatalogCache::default()
        }
    }
}

fn catalog_modified(path: Option<&str>) -> Option<SystemTime> {
    std::fs::metadata(path?).and_then(|m| m.modified()).ok()
}

fn log_outcome(outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::Fresh(report) => {
            let added: usize = report.stats.iter().map(|(_, s)| s.added).sum();
            let changed: usize = report.stats.iter().map(|(_, s)| s.changed).sum();
            tracing::info!(generation = report.generation, added, changed, "names refreshed");
            if !report.unpersisted.is_empty() {
                tracing::warn!(maps = ?report.unpersisted, "some snapshots were not persisted");
            }
        }
        RefreshOutcome::CachedFallback { generation, error } => {
            tracing::warn!(generation, error = %error, "refresh failed; serving cached names");
        }
        RefreshOutcome::Empty { generation, error } => {
            tracing::warn!(generation, error = %error, "refresh failed; no cached names yet");
        }
        RefreshOutcome::Superseded { generation } => {
            tracing::debug!(generation, "refresh superseded");
        }
    }
}
