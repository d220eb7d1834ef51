//! In-memory cache for upstream forecast payloads.
//!
//! Caches parsed Open-Meteo responses so repeated queries near the
//! same coordinate within the TTL window skip the upstream call.
//!
//! ## Cache Key Structure
//! Keys are composed of: kind:lat:lon:fields, with coordinates
//! rounded to 3 decimals so nearby lookups share an entry.
//!
//! ## Eviction Strategy
//! - Entry-count LRU eviction
//! - TTL-based expiration on read (lazy)

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;
use tokio::sync::RwLock;

const MAX_ENTRIES: usize = 512;

/// Cache key for upstream payload lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheKey {
    /// Payload kind ("aq" or "wx").
    pub kind: &'static str,
    pub lat: f64,
    pub lon: f64,
    /// Requested field names, comma-joined.
    pub fields: String,
}

impl CacheKey {
    pub fn new(kind: &'static str, lat: f64, lon: f64, fields: &[&str]) -> Self {
        Self {
            kind,
            lat,
            lon,
            fields: fields.join(","),
        }
    }

    fn to_string_key(&self) -> String {
        // Round to 3 decimals (~110 m) so jittered client coordinates
        // hit the same entry.
        format!(
            "{}:{:.3}:{:.3}:{}",
            self.kind, self.lat, self.lon, self.fields
        )
    }
}

struct CachedPayload {
    value: Value,
    inserted_at: Instant,
    ttl: Duration,
}

impl CachedPayload {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Statistics for the payload cache.
#[derive(Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub expired: AtomicU64,
}

impl CacheStats {
    /// Cache hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }
}

/// In-memory LRU cache for parsed upstream payloads.
pub struct ResponseCache {
    cache: Arc<RwLock<LruCache<String, CachedPayload>>>,
    default_ttl: Duration,
    stats: Arc<CacheStats>,
}

impl ResponseCache {
    pub fn new(ttl_secs: u64) -> Self {
        // MAX_ENTRIES is non-zero
        let max_entries = NonZeroUsize::new(MAX_ENTRIES).unwrap();
        Self {
            cache: Arc::new(RwLock::new(LruCache::new(max_entries))),
            default_ttl: Duration::from_secs(ttl_secs),
            stats: Arc::new(CacheStats::default()),
        }
    }

    /// Get a cached payload, dropping it if the TTL has passed.
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let string_key = key.to_string_key();
        let mut cache = self.cache.write().await;

        match cache.get(&string_key) {
            Some(entry) if entry.is_expired() => {
                cache.pop(&string_key);
                self.stats.expired.fetch_add(1, Ordering::Relaxed);
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(entry) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a payload under the default TTL.
    pub async fn put(&self, key: &CacheKey, value: Value) {
        let entry = CachedPayload {
            value,
            inserted_at: Instant::now(),
            ttl: self.default_ttl,
        };
        let mut cache = self.cache.write().await;
        cache.push(key.to_string_key(), entry);
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_then_get_hits() {
        let cache = ResponseCache::new(120);
        let key = CacheKey::new("aq", 37.5665, 126.978, &["pm10", "pm2_5"]);

        assert!(cache.get(&key).await.is_none());
        cache.put(&key, json!({"ok": true})).await;
        assert_eq!(cache.get(&key).await, Some(json!({"ok": true})));

        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().misses.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn nearby_coordinates_share_an_entry() {
        let cache = ResponseCache::new(120);
        cache
            .put(&CacheKey::new("aq", 37.56631, 126.97811, &["pm10"]), json!(1))
            .await;

        // Differs only past the third decimal.
        let near = CacheKey::new("aq", 37.56639, 126.97818, &["pm10"]);
        assert_eq!(cache.get(&near).await, Some(json!(1)));
    }

    #[tokio::test]
    async fn expired_entries_read_as_misses() {
        let cache = ResponseCache::new(0);
        let key = CacheKey::new("wx", 37.0, 127.0, &["precipitation"]);
        cache.put(&key, json!(2)).await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.get(&key).await.is_none());
        assert_eq!(cache.stats().expired.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn distinct_kinds_do_not_collide() {
        let cache = ResponseCache::new(120);
        cache
            .put(&CacheKey::new("aq", 37.0, 127.0, &["pm10"]), json!("aq"))
            .await;
        assert!(cache
            .get(&CacheKey::new("wx", 37.0, 127.0, &["pm10"]))
            .await
            .is_none());
    }
}
