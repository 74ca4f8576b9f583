//! Time-bound cache of merged search results, keyed by normalised criteria.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

use time::Duration;

use crate::domain::{Product, UtcDateTime};

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> UtcDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<UtcDateTime>>,
}

impl ManualClock {
    pub fn new(start: UtcDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(next) = now.checked_add(by) {
            *now = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UtcDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    products: Vec<Product>,
    inserted_at: UtcDateTime,
}

/// Criteria-keyed cache owned by one aggregator.
///
/// One `RwLock` guards the whole map. Entries are never modified after
/// insertion; an entry older than the TTL is removed by the read that finds
/// it. A zero TTL disables the cache.
#[derive(Debug, Clone)]
pub struct SearchCache {
    inner: Arc<tokio::sync::RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SearchCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(HashMap::new())),
            ttl: Duration::try_from(ttl).unwrap_or(Duration::MAX),
            clock,
        }
    }

    pub fn disabled() -> Self {
        Self::new(std::time::Duration::ZERO)
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl.is_zero()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<Product>> {
        if self.is_disabled() {
            return None;
        }

        let now = self.clock.now();
        {
            let map = self.inner.read().await;
            match map.get(key) {
                None => return None,
                Some(entry) if !self.is_expired(entry, now) => {
                    return Some(entry.products.clone());
                }
                Some(_) => {}
            }
        }

        let mut map = self.inner.write().await;
        if map
            .get(key)
            .is_some_and(|entry| self.is_expired(entry, now))
        {
            map.remove(key);
        }
        None
    }

    pub async fn put(&self, key: String, products: Vec<Product>) {
        if self.is_disabled() {
            return;
        }
        let entry = CacheEntry {
            products,
            inserted_at: self.clock.now(),
        };
        self.inner.write().await.insert(key, entry);
    }

    /// Number of stored entries, expired ones included until read.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    fn is_expired(&self, entry: &CacheEntry, now: UtcDateTime) -> bool {
        now.since(entry.inserted_at) > self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            UtcDateTime::from_ymd(2025, 1, 1).expect("valid date"),
        ))
    }

    #[tokio::test]
    async fn test_cache_hit_within_ttl() {
        let clock = clock();
        let cache = SearchCache::with_clock(std::time::Duration::from_secs(3600), clock.clone());

        cache
            .put(String::from("k"), vec![Product::new("STXNDQ", "Satrix NASDAQ 100")])
            .await;
        clock.advance(Duration::seconds(3600));

        let hit = cache.get("k").await.expect("entry is exactly at the TTL");
        assert_eq!(hit[0].ticker, "STXNDQ");
    }

    #[tokio::test]
    async fn test_cache_expired_entry_is_evicted_on_read() {
        let clock = clock();
        let cache = SearchCache::with_clock(std::time::Duration::from_secs(60), clock.clone());

        cache.put(String::from("k"), Vec::new()).await;
        assert_eq!(cache.len().await, 1);

        clock.advance(Duration::seconds(61));
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_cache_disabled() {
        let cache = SearchCache::disabled();
        assert!(cache.is_disabled());

        cache.put(String::from("k"), Vec::new()).await;
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_cache_clear() {
        let cache = SearchCache::new(std::time::Duration::from_secs(60));
        cache.put(String::from("a"), Vec::new()).await;
        cache.put(String::from("b"), Vec::new()).await;
        cache.clear().await;
        assert_eq!(cache.len().await, 0);
    }
}
