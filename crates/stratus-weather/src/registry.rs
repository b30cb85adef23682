//! Credential-scoped cache registry.
//!
//! One cache state exists per API credential for the process lifetime.
//! The registry hands out [`CacheHandle`]s sharing that state; the first
//! acquire for a credential also starts its background refresher when
//! polling is enabled.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::api::OwmClient;
use crate::cache::{Freshness, FreshnessCache};
use crate::config::CacheConfig;
use crate::refresh::Refresher;
use crate::types::Snapshot;

/// Shared handle to one credential's cache state.
///
/// Clones share the underlying state. The mutex is owned by the state and
/// lives as long as the process, so every foreground caller and the
/// background refresher contend on the same lock; each method below is one
/// atomic critical section over the whole cache.
#[derive(Clone)]
pub struct CacheHandle {
    inner: Arc<Mutex<FreshnessCache>>,
}

impl CacheHandle {
    pub(crate) fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FreshnessCache::new(config))),
        }
    }

    /// Atomic staleness check for `key` at instant `now`.
    pub fn lookup(&self, key: &str, now: DateTime<Utc>) -> Freshness {
        self.inner.lock().lookup(key, now)
    }

    /// Atomic insert/overwrite. Returns the key evicted by capacity
    /// pressure, if any.
    pub fn store(&self, key: &str, snapshot: Snapshot) -> Option<String> {
        let evicted = self.inner.lock().store(key, snapshot);
        if let Some(old) = &evicted {
            tracing::debug!(key, evicted = %old, "capacity eviction");
        }
        evicted
    }

    /// The stored coordinates for `key`, if present.
    pub fn coordinates(&self, key: &str) -> Option<(f64, f64)> {
        self.inner.lock().coordinates(key)
    }

    /// Every stale `(key, lat, lon)` triple at instant `now`.
    pub fn stale_entries(&self, now: DateTime<Utc>) -> Vec<(String, f64, f64)> {
        self.inner.lock().stale_entries(now)
    }

    /// Cached keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().keys()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// The freshness window entries are served within.
    pub fn ttl(&self) -> Duration {
        self.inner.lock().ttl()
    }

    /// Whether two handles share one cache state.
    pub fn shares_state_with(&self, other: &CacheHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

struct RegistryEntry {
    handle: CacheHandle,
    refresher: Option<Refresher>,
}

/// Process-wide credential → cache-state map.
///
/// Lazily populated; entries live until process exit. Only their
/// refreshers are torn down, via [`CredentialRegistry::shutdown`].
pub struct CredentialRegistry {
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

static REGISTRY: OnceLock<CredentialRegistry> = OnceLock::new();

impl CredentialRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry instance.
    pub fn global() -> &'static CredentialRegistry {
        REGISTRY.get_or_init(CredentialRegistry::new)
    }

    /// Look up or create the cache state for `credential`.
    ///
    /// The first call for a credential builds the state from `config` and,
    /// when polling is enabled, spawns a refresher driving `client`. Later
    /// calls return the existing state and ignore a differing `config`
    /// (first-writer-wins). The registry lock serializes construction and
    /// is held only for this lookup-or-insert; no network work happens
    /// under it. Requires an ambient Tokio runtime when `polling_enabled`
    /// is set.
    pub fn acquire(
        &self,
        credential: &str,
        config: &CacheConfig,
        client: &Arc<OwmClient>,
    ) -> CacheHandle {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(credential) {
            return entry.handle.clone();
        }

        let handle = CacheHandle::new(config);
        let refresher = config.polling_enabled.then(|| {
            tracing::info!(
                interval_secs = config.poll_interval_seconds,
                "starting background refresher"
            );
            Refresher::spawn(handle.clone(), Arc::clone(client), config.poll_interval())
        });

        // The credential is a secret; log the event, not the value.
        tracing::info!(
            ttl_secs = config.ttl_seconds,
            capacity = config.history_capacity,
            polling = config.polling_enabled,
            "cache state created for new credential"
        );

        entries.insert(
            credential.to_string(),
            RegistryEntry {
                handle: handle.clone(),
                refresher,
            },
        );
        handle
    }

    /// Number of credentials currently registered.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Stop every background refresher and wait for each to finish.
    ///
    /// Cache states stay registered; only the refresh tasks are torn down.
    pub async fn shutdown(&self) {
        let refreshers: Vec<Refresher> = {
            let mut entries = self.entries.lock();
            entries
                .values_mut()
                .filter_map(|entry| entry.refresher.take())
                .collect()
        };

        for refresher in refreshers {
            refresher.shutdown().await;
        }
        tracing::info!("registry shutdown complete");
    }
}

impl Default for CredentialRegistry {
    fn default() -> Self {
        Self::new()
    }
}
