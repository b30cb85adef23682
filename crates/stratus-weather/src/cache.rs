//! Per-credential freshness cache: TTL staleness plus bounded FIFO history.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::CacheConfig;
use crate::types::Snapshot;

/// Outcome of a cache lookup at a given instant.
#[derive(Debug, Clone, PartialEq)]
pub enum Freshness {
    /// Present and younger than the TTL; servable as-is.
    Fresh(Snapshot),
    /// Present but at or past the TTL; must be refreshed before serving.
    Stale(Snapshot),
    /// No entry for the key.
    Missing,
}

/// One credential's cache state: the latest snapshot per location key plus
/// the FIFO insertion history that drives eviction.
///
/// The key set of `entries` is always exactly the key set of `history`.
/// The structure itself is synchronous; callers share it behind the single
/// mutex owned by its registry entry, and each `lookup` or `store` must run
/// as one critical section under that lock.
#[derive(Debug)]
pub struct FreshnessCache {
    entries: HashMap<String, Snapshot>,
    history: VecDeque<String>,
    ttl_seconds: i64,
    capacity: usize,
}

impl FreshnessCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: HashMap::new(),
            history: VecDeque::new(),
            ttl_seconds: i64::try_from(config.ttl_seconds).unwrap_or(i64::MAX),
            // A zero capacity would make every store evict its own entry;
            // clamp to one so the cache always holds the latest insert.
            capacity: config.history_capacity.max(1),
        }
    }

    /// Staleness check for `key` at instant `now`.
    ///
    /// An entry is fresh while `now - observed_at < ttl`, judged against the
    /// snapshot's own observation instant. Aging alone never removes an
    /// entry; a stale snapshot stays present until replaced or evicted.
    pub fn lookup(&self, key: &str, now: DateTime<Utc>) -> Freshness {
        match self.entries.get(key) {
            Some(snapshot) => {
                let age = now.timestamp() - snapshot.observed_at;
                if age < self.ttl_seconds {
                    Freshness::Fresh(snapshot.clone())
                } else {
                    Freshness::Stale(snapshot.clone())
                }
            }
            None => Freshness::Missing,
        }
    }

    /// Insert or overwrite the entry for `key`.
    ///
    /// Overwrites keep the key's place in the insertion order. A new key at
    /// capacity evicts the oldest-inserted key first (FIFO, independent of
    /// access recency); the evicted key is returned.
    pub fn store(&mut self, key: &str, snapshot: Snapshot) -> Option<String> {
        if self.entries.insert(key.to_string(), snapshot).is_some() {
            return None;
        }
        let mut evicted = None;
        if self.history.len() == self.capacity {
            if let Some(oldest) = self.history.pop_front() {
                self.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }
        self.history.push_back(key.to_string());
        evicted
    }

    /// The stored coordinates for `key`, if present.
    pub fn coordinates(&self, key: &str) -> Option<(f64, f64)> {
        self.entries.get(key).map(|s| (s.lat, s.lon))
    }

    /// Every stale `(key, lat, lon)` triple at instant `now`, in insertion
    /// order. The refresher snapshots this under the lock, then fetches
    /// outside it.
    pub fn stale_entries(&self, now: DateTime<Utc>) -> Vec<(String, f64, f64)> {
        self.history
            .iter()
            .filter_map(|key| {
                let snapshot = self.entries.get(key)?;
                let age = now.timestamp() - snapshot.observed_at;
                (age >= self.ttl_seconds).then(|| (key.clone(), snapshot.lat, snapshot.lon))
            })
            .collect()
    }

    /// Cached keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The freshness window entries are served within.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.ttl_seconds).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(city: &str, observed_at: i64) -> Snapshot {
        Snapshot {
            city: city.to_string(),
            lat: 51.5,
            lon: -0.12,
            weather_main: "Clear".to_string(),
            weather_description: "clear sky".to_string(),
            temperature: 15.0,
            feels_like: 14.0,
            visibility: 10000,
            wind_speed: 3.0,
            observed_at,
            sunrise: observed_at - 21600,
            sunset: observed_at + 21600,
            timezone_offset: 0,
            name: city.to_string(),
        }
    }

    fn cache(ttl_seconds: u64, history_capacity: usize) -> FreshnessCache {
        FreshnessCache::new(&CacheConfig {
            ttl_seconds,
            history_capacity,
            ..CacheConfig::default()
        })
    }

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).unwrap()
    }

    #[test]
    fn test_lookup_missing() {
        let cache = cache(600, 10);
        assert_eq!(cache.lookup("London", at(0)), Freshness::Missing);
    }

    #[test]
    fn test_ttl_boundary() {
        let mut cache = cache(600, 10);
        let s = snapshot("London", 1_000);
        cache.store("London", s.clone());

        // Strictly inside the window: fresh.
        assert_eq!(cache.lookup("London", at(1_000)), Freshness::Fresh(s.clone()));
        assert_eq!(cache.lookup("London", at(1_599)), Freshness::Fresh(s.clone()));
        // At and past the boundary: stale, but still present.
        assert_eq!(cache.lookup("London", at(1_600)), Freshness::Stale(s.clone()));
        assert_eq!(cache.lookup("London", at(9_999)), Freshness::Stale(s));
        assert!(cache.contains("London"));
    }

    #[test]
    fn test_store_overwrites_without_reordering() {
        let mut cache = cache(600, 3);
        cache.store("A", snapshot("A", 100));
        cache.store("B", snapshot("B", 200));
        cache.store("C", snapshot("C", 300));

        // Re-storing A must not move it to the back of the eviction order.
        assert_eq!(cache.store("A", snapshot("A", 400)), None);
        assert_eq!(cache.keys(), vec!["A", "B", "C"]);

        // The next new key still evicts A, the oldest-inserted.
        assert_eq!(cache.store("D", snapshot("D", 500)), Some("A".to_string()));
        assert_eq!(cache.keys(), vec!["B", "C", "D"]);
        assert!(!cache.contains("A"));
    }

    #[test]
    fn test_fifo_eviction_scenario() {
        // Capacity 10, insert A..J, then K: A goes, B..K stay.
        let mut cache = cache(600, 10);
        let cities: Vec<String> = ('A'..='J').map(|c| c.to_string()).collect();
        for city in &cities {
            assert_eq!(cache.store(city, snapshot(city, 100)), None);
        }
        assert_eq!(cache.len(), 10);

        assert_eq!(cache.store("K", snapshot("K", 100)), Some("A".to_string()));
        assert_eq!(cache.len(), 10);
        assert!(!cache.contains("A"));
        for city in cities.iter().skip(1) {
            assert!(cache.contains(city));
        }
        assert!(cache.contains("K"));
    }

    #[test]
    fn test_history_matches_entries_after_churn() {
        let mut cache = cache(600, 4);
        for i in 0..20 {
            cache.store(&format!("city-{}", i % 7), snapshot("x", 100));
        }
        let keys = cache.keys();
        assert_eq!(keys.len(), cache.len());
        assert!(cache.len() <= 4);
        for key in &keys {
            assert!(cache.contains(key));
        }
    }

    #[test]
    fn test_stale_entries_selects_only_expired() {
        let mut cache = cache(600, 10);
        cache.store("old", snapshot("old", 100));
        cache.store("new", snapshot("new", 5_000));

        let stale = cache.stale_entries(at(5_100));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].0, "old");
        assert_eq!((stale[0].1, stale[0].2), (51.5, -0.12));
    }

    #[test]
    fn test_zero_capacity_clamped_to_one() {
        let mut cache = cache(600, 0);
        cache.store("A", snapshot("A", 100));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.store("B", snapshot("B", 100)), Some("A".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_coordinates() {
        let mut cache = cache(600, 10);
        cache.store("London", snapshot("London", 100));
        assert_eq!(cache.coordinates("London"), Some((51.5, -0.12)));
        assert_eq!(cache.coordinates("Paris"), None);
    }
}
