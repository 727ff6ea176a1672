//! naming-core: client-side naming cache for neurons and principals.
//!
//! Persisted name maps (Sled + DashMap), a merge that never drops names, a registry
//! client that refreshes the maps concurrently, and synchronous lookup/search over them.
//! Consumers hold an `Arc<NamingService>` and subscribe to its change events.

mod catalog;
mod config;
mod keys;
mod lookup;
mod maps;
mod merge;
mod registry;
mod search;
mod service;
mod shared;
mod snapshot_store;

// Keys
pub use keys::{CompositeKey, IdentityKind, KeyError, NeuronKey, PrincipalKey, KEY_DELIMITER};

// Shared provenance tags + persisted key names
pub use shared::{
    MapKind, Sourced, ALL_STORAGE_KEYS, LAST_UPDATED_KEY, NEURON_NAMES_KEY, NEURON_NICKNAMES_KEY,
    PRINCIPAL_NAMES_KEY, PRINCIPAL_NICKNAMES_KEY, VERIFIED_NAMES_KEY,
};

// Configuration
pub use config::NamingConfig;

// Persistent key-value cache + merge engine
pub use merge::{merge_maps, merge_with_stats, MergeStats};
pub use snapshot_store::{SnapshotStore, DEFAULT_NAMESPACE};

// Registry seam
#[cfg(feature = "http")]
pub use registry::HttpNamingRegistry;
pub use registry::{
    CallerIdentity, NamingRegistry, RawNeuronName, RawNeuronNickname, RawPrincipalName, RawPrincipalNickname,
    RegistryError, RegistryResult,
};

// Collective catalog
pub use catalog::{catalog_principal_names, CatalogCache, CatalogError, CatalogUpdated, CollectiveCatalogEntry};

// Maps, lookup and search
pub use lookup::{
    display_name_for_neuron, display_name_for_principal, lookup_neuron, lookup_principal, principal_overlay,
    shorten_id, NeuronNaming, PrincipalNaming,
};
pub use maps::{NameMap, NamingDelta, NamingMapSet, VerifiedMap};
pub use search::{
    search_neurons, search_neurons_with_limit, search_principals, search_principals_with_limit, MatchTier,
    SearchHit, SearchMode, DEFAULT_SEARCH_LIMIT,
};

// Service (registry client + distribution)
pub use service::{InitMode, NamingEvent, NamingService, RefreshOutcome, RefreshReport};
