//! Naming service: owns the maps, refreshes them from the registry, and fans changes out
//! to subscribers.
//!
//! ## Lifecycle
//!
//! ```text
//! new()          seed maps from the snapshot store (stale but instant)
//! init()         cached data  -> background refresh, return at once
//!                no cached data -> blocking refresh with the loading flag set
//! set_caller()   identity change -> background refresh (picks up nicknames)
//! watch_catalog() catalog signal -> recompute principal overlay, no fetch
//! dispose()      abort background tasks
//! ```
//!
//! Overlapping refreshes are ordered by a generation counter: a refresh is discarded
//! when a newer generation has already been applied. A newer refresh that fails does
//! not discard an older one still in flight.

use crate::catalog::CatalogCache;
use crate::keys::{NeuronKey, PrincipalKey};
use crate::lookup::{self, NeuronNaming, PrincipalNaming};
use crate::maps::{NameMap, NamingDelta, NamingMapSet};
use crate::merge::MergeStats;
use crate::registry::{CallerIdentity, NamingRegistry, RegistryError, RegistryResult};
use crate::search::{self, SearchHit, SearchMode, DEFAULT_SEARCH_LIMIT};
use crate::shared::{MapKind, Sourced};
use crate::snapshot_store::SnapshotStore;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 256;

/// Change notifications for consumers. One `MapUpdated` per map per refresh, even when
/// nothing changed; consumers re-read through the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingEvent {
    MapUpdated(MapKind),
    /// Principal-name overlay recomputed (after a refresh or a catalog signal).
    PrincipalOverlayUpdated,
    LoadingChanged(bool),
    RefreshFailed { generation: u64 },
}

/// How `init` ran the first refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Cached data was served immediately; refresh runs in the background.
    Background,
    /// No cached data; the first refresh was awaited with the loading flag set.
    Blocking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    pub generation: u64,
    pub stats: Vec<(MapKind, MergeStats)>,
    pub nicknames_fetched: bool,
    pub skipped_rows: usize,
    /// Maps whose snapshot write failed; in-memory state is still updated.
    pub unpersisted: Vec<MapKind>,
    pub refreshed_at: DateTime<Utc>,
}

/// Result of one `refresh_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Registry data merged and persisted.
    Fresh(RefreshReport),
    /// Fetch failed; previously cached data keeps serving.
    CachedFallback { generation: u64, error: String },
    /// Fetch failed and there is nothing cached.
    Empty { generation: u64, error: String },
    /// A later refresh was applied before this one finished; results discarded.
    Superseded { generation: u64 },
}

impl RefreshOutcome {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

pub struct NamingService {
    registry: Arc<dyn NamingRegistry>,
    store: SnapshotStore,
    catalog: Arc<CatalogCache>,
    maps: RwLock<Arc<NamingMapSet>>,
    overlay: RwLock<Arc<NameMap>>,
    caller: RwLock<Option<CallerIdentity>>,
    loading: AtomicBool,
    generation: AtomicU64,
    /// Highest generation merged into the maps. Only written under the maps write lock.
    applied: AtomicU64,
    /// True once a refresh succeeded in this session.
    fresh: AtomicBool,
    last_refreshed: RwLock<Option<DateTime<Utc>>>,
    search_limit: usize,
    events: broadcast::Sender<NamingEvent>,
    tasks: Mutex<Vec<AbortHandle>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|p| p.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}

impl NamingService {
    /// Seeds the maps from `store` synchronously; no network call is made here.
    pub fn new(
        registry: Arc<dyn NamingRegistry>,
        store: SnapshotStore,
        catalog: Arc<CatalogCache>,
        caller: Option<CallerIdentity>,
    ) -> Arc<Self> {
        Arc::new(Self::build(registry, store, catalog, caller, DEFAULT_SEARCH_LIMIT))
    }

    /// Same as [`NamingService::new`] with a custom search cap.
    pub fn with_search_limit(
        registry: Arc<dyn NamingRegistry>,
        store: SnapshotStore,
        catalog: Arc<CatalogCache>,
        caller: Option<CallerIdentity>,
        search_limit: usize,
    ) -> Arc<Self> {
        Arc::new(Self::build(registry, store, catalog, caller, search_limit.max(1)))
    }

    fn build(
        registry: Arc<dyn NamingRegistry>,
        store: SnapshotStore,
        catalog: Arc<CatalogCache>,
        caller: Option<CallerIdentity>,
        search_limit: usize,
    ) -> Self {
        let maps = NamingMapSet::load(&store);
        let overlay = lookup::principal_overlay(&maps, &catalog.get_all());
        let last_refreshed = store.load_timestamp();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        info!(
            neuron_names = maps.neuron_names.len(),
            principal_names = maps.principal_names.len(),
            last_refreshed = ?last_refreshed,
            "naming service seeded from snapshot"
        );
        Self {
            registry,
            store,
            catalog,
            maps: RwLock::new(Arc::new(maps)),
            overlay: RwLock::new(Arc::new(overlay)),
            caller: RwLock::new(caller),
            loading: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            fresh: AtomicBool::new(false),
            last_refreshed: RwLock::new(last_refreshed),
            search_limit,
            events,
            tasks: Mutex::new(Vec::new()),
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    pub async fn init(self: &Arc<Self>) -> InitMode {
        if !read(&self.maps).is_empty() {
            debug!("cached names present; refreshing in background");
            self.spawn_refresh();
            InitMode::Background
        } else {
            self.refresh_all(false).await;
            InitMode::Blocking
        }
    }

    /// Changes the caller and refreshes in the background. No-op when unchanged.
    pub fn set_caller(self: &Arc<Self>, caller: Option<CallerIdentity>) -> Option<JoinHandle<RefreshOutcome>> {
        {
            let mut current = write(&self.caller);
            if *current == caller {
                return None;
            }
            info!(caller = ?caller.as_ref().map(|c| c.as_str()), "caller identity changed");
            *current = caller;
        }
        Some(self.spawn_refresh())
    }

    pub fn caller(&self) -> Option<CallerIdentity> {
        read(&self.caller).clone()
    }

    /// Spawns a background refresh task tracked by [`NamingService::dispose`].
    pub fn spawn_refresh(self: &Arc<Self>) -> JoinHandle<RefreshOutcome> {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.refresh_all(true).await });
        self.track(handle.abort_handle());
        handle
    }

    /// Recomputes the principal overlay whenever the catalog fires. Holds only a weak
    /// reference, so the task ends once the service is dropped or disposed.
    pub fn watch_catalog(self: &Arc<Self>) {
        let mut rx = self.catalog.subscribe();
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        let Some(this) = weak.upgrade() else { break };
                        this.recompute_overlay();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("catalog watcher stopped");
        });
        self.track(handle.abort_handle());
    }

    fn track(&self, handle: AbortHandle) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }

    /// Aborts background work. Cached data stays readable.
    pub fn dispose(&self) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|p| p.into_inner());
        for h in tasks.drain(..) {
            h.abort();
        }
        self.set_loading(false);
        debug!("naming service disposed");
    }

    // -------------------------------------------------------------------------
    // Refresh
    // -------------------------------------------------------------------------

    /// Fetches all four datasets concurrently and merges them into the maps.
    ///
    /// Any fetch error aborts the whole cycle and leaves the maps untouched.
    /// Never panics or returns an error; see [`RefreshOutcome`].
    pub async fn refresh_all(&self, background: bool) -> RefreshOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if !background {
            self.set_loading(true);
        }
        let caller = self.caller();
        debug!(generation, background, anonymous = caller.is_none(), "refresh started");

        let outcome = match self.fetch(caller.as_ref()).await {
            Ok(delta) => self.apply(generation, delta, caller.is_some()),
            Err(e) => {
                warn!(generation, error = %e, "registry refresh failed; serving cached names");
                let _ = self.events.send(NamingEvent::RefreshFailed { generation });
                let error = e.to_string();
                if read(&self.maps).is_empty() {
                    RefreshOutcome::Empty { generation, error }
                } else {
                    RefreshOutcome::CachedFallback { generation, error }
                }
            }
        };

        if self.generation.load(Ordering::SeqCst) == generation {
            self.set_loading(false);
        }
        outcome
    }

    async fn fetch(&self, caller: Option<&CallerIdentity>) -> RegistryResult<NamingDelta> {
        let registry = &*self.registry;
        let neuron_nicknames = async {
            match caller {
                Some(c) => registry.neuron_nicknames(c).await.map(Some),
                None => Ok(None),
            }
        };
        let principal_nicknames = async {
            match caller {
                Some(c) => registry.principal_nicknames(c).await.map(Some),
                None => Ok(None),
            }
        };
        let (nn, nk, pn, pk) = tokio::try_join!(
            registry.neuron_names(),
            neuron_nicknames,
            registry.principal_names(),
            principal_nicknames,
        )?;
        Ok(NamingDelta::from_rows(nn, nk, pn, pk))
    }

    fn apply(&self, generation: u64, delta: NamingDelta, nicknames_fetched: bool) -> RefreshOutcome {
        let report = {
            let mut maps = write(&self.maps);
            // Checked under the write lock so a superseded refresh can never land last.
            let applied = self.applied.load(Ordering::SeqCst);
            if applied > generation {
                debug!(generation, applied, "refresh superseded; discarding results");
                return RefreshOutcome::Superseded { generation };
            }
            self.applied.store(generation, Ordering::SeqCst);
            let (next, stats) = maps.apply(&delta);
            let unpersisted: Vec<MapKind> = stats
                .iter()
                .map(|(kind, _)| *kind)
                .filter(|kind| !next.persist(&self.store, *kind))
                .collect();
            let refreshed_at = Utc::now();
            self.store.save_timestamp(refreshed_at);
            *maps = Arc::new(next);
            RefreshReport {
                generation,
                stats,
                nicknames_fetched,
                skipped_rows: delta.skipped,
                unpersisted,
                refreshed_at,
            }
        };

        *write(&self.last_refreshed) = Some(report.refreshed_at);
        self.fresh.store(true, Ordering::SeqCst);
        for kind in MapKind::ALL {
            let _ = self.events.send(NamingEvent::MapUpdated(kind));
        }
        self.recompute_overlay();

        for (kind, s) in &report.stats {
            debug!(generation, map = ?kind, added = s.added, changed = s.changed, "map merged");
        }
        info!(
            generation,
            nicknames = nicknames_fetched,
            skipped = report.skipped_rows,
            "naming refresh applied"
        );
        RefreshOutcome::Fresh(report)
    }

    /// Rebuilds the principal-name overlay from the current maps and catalog. No fetch.
    pub fn recompute_overlay(&self) {
        {
            // Held across the rebuild: whichever recompute stores last read the latest maps.
            // Never taken while holding the maps lock.
            let mut overlay = write(&self.overlay);
            let maps = self.snapshot();
            *overlay = Arc::new(lookup::principal_overlay(&maps, &self.catalog.get_all()));
        }
        let _ = self.events.send(NamingEvent::PrincipalOverlayUpdated);
    }

    fn set_loading(&self, loading: bool) {
        if self.loading.swap(loading, Ordering::SeqCst) != loading {
            let _ = self.events.send(NamingEvent::LoadingChanged(loading));
        }
    }

    // -------------------------------------------------------------------------
    // Mutations (forwarded to the registry, then refreshed)
    // -------------------------------------------------------------------------

    fn require_caller(&self) -> RegistryResult<CallerIdentity> {
        self.caller().ok_or(RegistryError::Anonymous)
    }

    pub async fn set_neuron_name(&self, collective_id: &str, fingerprint_hex: &str, name: &str) -> RegistryResult<RefreshOutcome> {
        let caller = self.require_caller()?;
        let key = NeuronKey::new(collective_id, fingerprint_hex)?;
        self.registry
            .set_neuron_name(&caller, key.collective_id(), key.fingerprint_hex(), name)
            .await?;
        Ok(self.refresh_all(true).await)
    }

    pub async fn set_neuron_nickname(
        &self,
        collective_id: &str,
        fingerprint_hex: &str,
        nickname: &str,
    ) -> RegistryResult<RefreshOutcome> {
        let caller = self.require_caller()?;
        let key = NeuronKey::new(collective_id, fingerprint_hex)?;
        self.registry
            .set_neuron_nickname(&caller, key.collective_id(), key.fingerprint_hex(), nickname)
            .await?;
        Ok(self.refresh_all(true).await)
    }

    pub async fn set_principal_name(&self, principal: &str, name: &str) -> RegistryResult<RefreshOutcome> {
        let caller = self.require_caller()?;
        let key = PrincipalKey::new(principal)?;
        self.registry.set_principal_name(&caller, key.as_str(), name).await?;
        Ok(self.refresh_all(true).await)
    }

    pub async fn set_principal_nickname(&self, principal: &str, nickname: &str) -> RegistryResult<RefreshOutcome> {
        let caller = self.require_caller()?;
        let key = PrincipalKey::new(principal)?;
        self.registry.set_principal_nickname(&caller, key.as_str(), nickname).await?;
        Ok(self.refresh_all(true).await)
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn subscribe(&self) -> broadcast::Receiver<NamingEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> Arc<NamingMapSet> {
        Arc::clone(&read(&self.maps))
    }

    /// Snapshot tagged with whether a refresh has succeeded in this session.
    pub fn snapshot_sourced(&self) -> Sourced<Arc<NamingMapSet>> {
        let maps = self.snapshot();
        if self.fresh.load(Ordering::SeqCst) {
            Sourced::Fresh(maps)
        } else if maps.is_empty() {
            Sourced::Empty
        } else {
            Sourced::CachedFallback(maps)
        }
    }

    /// Registry principal names overlaid on catalog-derived labels.
    pub fn principal_names(&self) -> Arc<NameMap> {
        Arc::clone(&read(&self.overlay))
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        *read(&self.last_refreshed)
    }

    pub fn lookup_neuron(&self, fingerprint_hex: &str, collective_id: &str) -> NeuronNaming {
        lookup::lookup_neuron(&self.snapshot(), fingerprint_hex, collective_id)
    }

    pub fn lookup_principal(&self, id: &str) -> PrincipalNaming {
        lookup::lookup_principal(&self.snapshot(), &self.principal_names(), id)
    }

    pub fn neuron_display_name(&self, fingerprint_hex: &str, collective_id: &str) -> String {
        lookup::display_name_for_neuron(&self.lookup_neuron(fingerprint_hex, collective_id), fingerprint_hex)
    }

    pub fn principal_display_name(&self, id: &str) -> String {
        lookup::display_name_for_principal(&self.lookup_principal(id), id)
    }

    pub fn search_neurons(&self, query: &str, collective_id: &str, mode: SearchMode) -> Vec<SearchHit> {
        search::search_neurons_with_limit(&self.snapshot(), query, collective_id, mode, self.search_limit)
    }

    pub fn search_principals(&self, query: &str, mode: SearchMode) -> Vec<SearchHit> {
        search::search_principals_with_limit(
            &self.snapshot(),
            &self.principal_names(),
            query,
            mode,
            self.search_limit,
        )
    }

    /// Drops every persisted snapshot and the in-memory maps.
    pub fn clear_cache(&self) {
        self.store.clear_all();
        *write(&self.maps) = Arc::new(NamingMapSet::default());
        *write(&self.last_refreshed) = None;
        self.fresh.store(false, Ordering::SeqCst);
        for kind in MapKind::ALL {
            let _ = self.events.send(NamingEvent::MapUpdated(kind));
        }
        self.recompute_overlay();
        info!(namespace = %self.store.namespace(), "naming cache cleared");
    }
}
