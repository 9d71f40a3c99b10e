//! In-memory TTL cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use weather_core::constants::DEFAULT_CACHE_TTL_SECONDS;

/// Upper bound on the TTL so `Instant + ttl` cannot overflow.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Cached value with its absolute expiry.
///
/// Never mutated in place; a `set` replaces the whole entry.
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds an entry stays live after insertion
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }
}

/// Thread-safe key/value cache with a uniform time-to-live.
///
/// Every operation runs under one mutex covering the whole map, so each
/// call is atomic with respect to every other call. A read-write lock is not
/// used because `get` removes expired entries.
///
/// Reads do not extend an entry's life, and there is no capacity bound:
/// entries leave the map only by expiry, `clear`, or `remove_expired`.
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache where entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: ttl.min(MAX_TTL),
        }
    }

    /// Creates a cache from configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_seconds))
    }

    /// Returns the configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a clone of the live value for `key`.
    ///
    /// An expired entry is removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    /// Stores `value` under `key`, live for one TTL from now.
    ///
    /// Replaces any previous entry regardless of its own expiry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_at(key.into(), value, Instant::now());
    }

    pub(crate) fn set_at(&self, key: String, value: V, now: Instant) {
        let entry = CacheEntry {
            value,
            expires_at: now + self.ttl,
        };
        self.entries.lock().insert(key, entry);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Removes every expired entry and returns how many were dropped.
    ///
    /// Live entries are never touched. Meant to be called periodically by an
    /// outside scheduler to bound memory held by keys nobody reads again.
    pub fn remove_expired(&self) -> usize {
        self.remove_expired_at(Instant::now())
    }

    pub(crate) fn remove_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        before - entries.len()
    }

    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.entries.lock();
        let expired = entries.values().filter(|e| e.is_expired_at(now)).count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            live_entries: entries.len() - expired,
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::with_config(CacheConfig::default())
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub live_entries: usize,
    pub ttl_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use proptest::prelude::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_cache_set_get() {
        let cache = TtlCache::new(secs(60));
        cache.set("weather_london", "cloudy".to_string());
        assert_eq!(cache.get("weather_london").as_deref(), Some("cloudy"));
    }

    #[test]
    fn test_cache_miss_has_no_side_effect() {
        let cache: TtlCache<u32> = TtlCache::new(secs(60));
        cache.set("weather_paris", 1);
        assert!(cache.get("weather_oslo").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_scenario() {
        let cache = TtlCache::new(secs(2));
        let t0 = Instant::now();
        cache.set_at("weather_london".into(), "X", t0);

        assert_eq!(cache.get_at("weather_london", t0 + secs(1)), Some("X"));
        assert_eq!(cache.get_at("weather_london", t0 + secs(3)), None);
        assert_eq!(cache.remove_expired_at(t0 + secs(3)), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let cache = TtlCache::new(secs(10));
        let t0 = Instant::now();
        cache.set_at("k".into(), 7, t0);

        assert_eq!(cache.get_at("k", t0 + Duration::from_millis(9_999)), Some(7));
        assert_eq!(cache.get_at("k", t0 + secs(10)), None);
    }

    #[test]
    fn test_lazy_eviction_on_read() {
        let cache = TtlCache::new(secs(5));
        let t0 = Instant::now();
        cache.set_at("k".into(), 1, t0);
        assert_eq!(cache.len(), 1);

        assert!(cache.get_at("k", t0 + secs(6)).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_reads_do_not_extend_life() {
        let cache = TtlCache::new(secs(5));
        let t0 = Instant::now();
        cache.set_at("k".into(), 1, t0);

        for s in 1..5 {
            assert_eq!(cache.get_at("k", t0 + secs(s)), Some(1));
        }
        assert!(cache.get_at("k", t0 + secs(5)).is_none());
    }

    #[test]
    fn test_overwrite_restarts_ttl() {
        let cache = TtlCache::new(secs(10));
        let t0 = Instant::now();
        cache.set_at("k".into(), "v1", t0);
        cache.set_at("k".into(), "v2", t0 + secs(8));

        assert_eq!(cache.get_at("k", t0 + secs(8)), Some("v2"));
        // Past the first entry's expiry, still within the second's.
        assert_eq!(cache.get_at("k", t0 + secs(15)), Some("v2"));
        assert_eq!(cache.get_at("k", t0 + secs(18)), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_overwrite_replaces_expired_entry() {
        let cache = TtlCache::new(secs(1));
        let t0 = Instant::now();
        cache.set_at("k".into(), 1, t0);
        cache.set_at("k".into(), 2, t0 + secs(5));
        assert_eq!(cache.get_at("k", t0 + secs(5)), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_clear() {
        let cache = TtlCache::new(secs(60));
        cache.set("weather_london", 1);
        cache.set("forecast_london", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("weather_london").is_none());
        assert!(cache.get("forecast_london").is_none());
    }

    #[test]
    fn test_remove_expired_keeps_live_entries() {
        let cache = TtlCache::new(secs(10));
        let t0 = Instant::now();
        cache.set_at("old".into(), 1, t0);
        cache.set_at("new".into(), 2, t0 + secs(6));

        let removed = cache.remove_expired_at(t0 + secs(12));
        assert_eq!(removed, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at("new", t0 + secs(12)), Some(2));
    }

    #[test]
    fn test_remove_expired_is_idempotent() {
        let cache = TtlCache::new(secs(10));
        let t0 = Instant::now();
        cache.set_at("a".into(), 1, t0);
        cache.set_at("b".into(), 2, t0 + secs(5));

        let now = t0 + secs(11);
        assert_eq!(cache.remove_expired_at(now), 1);
        assert_eq!(cache.remove_expired_at(now), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_expiration_real_clock() {
        let cache = TtlCache::new(Duration::from_millis(1));
        cache.set("weather_cairo", 30);
        thread::sleep(Duration::from_millis(10));
        assert!(cache.get("weather_cairo").is_none());
    }

    #[test]
    fn test_cache_stats() {
        let cache = TtlCache::new(Duration::from_millis(1));
        cache.set("a", 1);
        thread::sleep(Duration::from_millis(10));

        let stats = cache.stats();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.live_entries, 0);
    }

    #[test]
    fn test_default_uses_configured_ttl() {
        let cache: TtlCache<u8> = TtlCache::default();
        assert_eq!(cache.ttl(), secs(DEFAULT_CACHE_TTL_SECONDS));

        let cache: TtlCache<u8> = TtlCache::with_config(CacheConfig { ttl_seconds: 2 });
        assert_eq!(cache.ttl(), secs(2));
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let cache = TtlCache::new(Duration::MAX);
        cache.set("k", 1);
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn test_concurrent_writers_same_key() {
        let cache = Arc::new(TtlCache::new(secs(60)));

        let handles: Vec<_> = (0..100)
            .map(|i| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.set("k", i))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let value = cache.get("k").expect("one of the writes must be visible");
        assert!((0..100).contains(&value));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_mixed_operations() {
        let cache = Arc::new(TtlCache::new(secs(60)));

        let handles: Vec<_> = (0..16)
            .map(|t| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("weather_city{}", i % 10);
                        cache.set(key.clone(), t * 1000 + i);
                        let _ = cache.get(&key);
                        if i % 50 == 0 {
                            cache.remove_expired();
                        }
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(cache.len(), 10);
        for i in 0..10 {
            assert!(cache.get(&format!("weather_city{}", i)).is_some());
        }
    }

    proptest! {
        #[test]
        fn prop_sweep_never_drops_live_entries(
            offsets in proptest::collection::vec(0u64..100, 1..40),
            sweep_at in 0u64..200,
        ) {
            let cache = TtlCache::new(secs(50));
            let t0 = Instant::now();
            for (i, off) in offsets.iter().enumerate() {
                cache.set_at(format!("k{}", i), i, t0 + secs(*off));
            }

            let now = t0 + secs(sweep_at);
            cache.remove_expired_at(now);
            let after_once = cache.len();
            prop_assert_eq!(cache.remove_expired_at(now), 0);
            prop_assert_eq!(cache.len(), after_once);

            for (i, off) in offsets.iter().enumerate() {
                let live = sweep_at < off + 50;
                prop_assert_eq!(cache.get_at(&format!("k{}", i), now).is_some(), live);
            }
        }
    }
}
