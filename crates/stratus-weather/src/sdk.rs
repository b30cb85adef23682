//! Credential-bound orchestration: cache lookup, coordinate resolution,
//! fetch, store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::api::OwmClient;
use crate::cache::Freshness;
use crate::config::CacheConfig;
use crate::error::WeatherError;
use crate::registry::{CacheHandle, CredentialRegistry};
use crate::types::Snapshot;

/// Weather client scoped to one API credential.
///
/// Every `WeatherSdk` built for the same credential against the same
/// registry shares one cache state and at most one background refresher.
pub struct WeatherSdk {
    client: Arc<OwmClient>,
    handle: CacheHandle,
}

impl WeatherSdk {
    /// Build a client against the process-wide registry.
    ///
    /// Requires an ambient Tokio runtime when `config.polling_enabled` is
    /// set, since the first acquire for a credential spawns its refresher.
    pub fn new(api_key: &str, config: &CacheConfig) -> Result<Self, WeatherError> {
        let client = Arc::new(OwmClient::new(api_key)?);
        Ok(Self::with_client(
            api_key,
            client,
            config,
            CredentialRegistry::global(),
        ))
    }

    /// Build a client with explicit collaborators.
    ///
    /// Lets tests point at a mock server and a private registry; `new` is
    /// this with the default client and the global registry.
    pub fn with_client(
        credential: &str,
        client: Arc<OwmClient>,
        config: &CacheConfig,
        registry: &CredentialRegistry,
    ) -> Self {
        let handle = registry.acquire(credential, config, &client);
        Self { client, handle }
    }

    /// Current conditions for `city`, served from cache while fresh.
    pub async fn weather(&self, city: &str) -> Result<Snapshot, WeatherError> {
        self.fetch_or_cached(city, None).await
    }

    /// Like [`WeatherSdk::weather`], but with explicit coordinates instead
    /// of geocoding.
    pub async fn weather_at(
        &self,
        city: &str,
        lat: f64,
        lon: f64,
    ) -> Result<Snapshot, WeatherError> {
        self.fetch_or_cached(city, Some((lat, lon))).await
    }

    async fn fetch_or_cached(
        &self,
        city: &str,
        coords: Option<(f64, f64)>,
    ) -> Result<Snapshot, WeatherError> {
        let previous = match self.handle.lookup(city, Utc::now()) {
            Freshness::Fresh(snapshot) => {
                tracing::debug!(city, "serving fresh cache entry");
                return Ok(snapshot);
            }
            Freshness::Stale(snapshot) => Some(snapshot),
            Freshness::Missing => None,
        };

        // Coordinate resolution prefers explicit input, then the stale
        // snapshot's stored pair; only a never-seen city geocodes.
        let (lat, lon) = match (coords, &previous) {
            (Some(pair), _) => pair,
            (None, Some(snapshot)) => (snapshot.lat, snapshot.lon),
            (None, None) => self.client.geocode(city).await?,
        };

        // Fetch failures propagate here without touching the cache.
        let observation = self.client.current_weather(lat, lon).await?;
        let snapshot = observation.into_snapshot(city, lat, lon);
        self.handle.store(city, snapshot.clone());
        tracing::debug!(city, "snapshot stored");
        Ok(snapshot)
    }

    /// Coordinates for `city`: the cached snapshot's pair when present,
    /// otherwise geocoded. Never writes to the cache.
    pub async fn city_coordinates(&self, city: &str) -> Result<(f64, f64), WeatherError> {
        if let Some(pair) = self.handle.coordinates(city) {
            return Ok(pair);
        }
        self.client.geocode(city).await
    }

    /// The freshness window cached entries are served within.
    pub fn update_interval(&self) -> Duration {
        self.handle.ttl()
    }

    /// The cache state backing this client.
    pub fn handle(&self) -> &CacheHandle {
        &self.handle
    }
}
