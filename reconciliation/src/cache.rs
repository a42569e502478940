//! Provider metadata cache
//!
//! In-process cache of provider display metadata with a fixed time-to-live.
//! Stale entries read as misses and are dropped on `expire`.

use crate::{config::ProviderCacheConfig, positions::ProviderPosition};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use stake_core::Address;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Display metadata for a staking provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Display name
    pub name: String,

    /// Website, if published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Commission in basis points
    #[serde(default)]
    pub commission_bps: u16,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    metadata: ProviderMetadata,
    inserted_at: Instant,
}

impl CacheEntry {
    fn new(metadata: ProviderMetadata) -> Self {
        Self {
            metadata,
            inserted_at: Instant::now(),
        }
    }

    fn is_stale(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

/// Cache hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a fresh entry
    pub hits: u64,
    /// Lookups that found nothing or a stale entry
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate in percent
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64) / (total as f64) * 100.0
        }
    }
}

/// TTL cache keyed by provider address
#[derive(Debug)]
pub struct ProviderMetadataCache {
    entries: RwLock<HashMap<Address, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ProviderMetadataCache {
    /// Create empty cache with the given entry lifetime
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create empty cache from configuration
    pub fn from_config(config: &ProviderCacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_seconds))
    }

    /// Replace the whole cache content and reset counters
    pub fn init<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (Address, ProviderMetadata)>,
    {
        let fresh: HashMap<Address, CacheEntry> = entries
            .into_iter()
            .map(|(provider, metadata)| (provider, CacheEntry::new(metadata)))
            .collect();

        let count = fresh.len();
        *self.entries.write() = fresh;
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);

        tracing::debug!(providers = count, "Initialized provider metadata cache");
    }

    /// Look up a provider; stale entries count as misses
    pub fn get(&self, provider: &Address) -> Option<ProviderMetadata> {
        let found = self
            .entries
            .read()
            .get(provider)
            .filter(|entry| !entry.is_stale(self.ttl))
            .map(|entry| entry.metadata.clone());

        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };

        found
    }

    /// Insert or refresh one entry
    pub fn insert(&self, provider: Address, metadata: ProviderMetadata) {
        self.entries.write().insert(provider, CacheEntry::new(metadata));
    }

    /// Drop stale entries, returning how many were purged
    pub fn expire(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_stale(self.ttl));
        let purged = before - entries.len();

        if purged > 0 {
            tracing::debug!(purged, "Expired provider metadata entries");
        }

        purged
    }

    /// Number of entries, stale ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Hit/miss counters since the last `init`
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Attach cached metadata to a provider roster
    pub fn annotate(&self, roster: &mut [ProviderPosition]) {
        for position in roster.iter_mut() {
            position.metadata = self.get(&position.provider);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stake_core::TokenAmount;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{}", format!("{:02x}", n).repeat(20))).unwrap()
    }

    fn metadata(name: &str) -> ProviderMetadata {
        ProviderMetadata {
            name: name.to_string(),
            website: None,
            commission_bps: 500,
        }
    }

    #[test]
    fn test_get_and_stats() {
        let cache = ProviderMetadataCache::new(Duration::from_secs(60));
        cache.init([(addr(1), metadata("alpha"))]);

        assert_eq!(cache.get(&addr(1)), Some(metadata("alpha")));
        assert_eq!(cache.get(&addr(2)), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_init_replaces_content() {
        let cache = ProviderMetadataCache::new(Duration::from_secs(60));
        cache.init([(addr(1), metadata("alpha"))]);
        cache.get(&addr(1));

        cache.init([(addr(2), metadata("beta")), (addr(3), metadata("gamma"))]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(cache.get(&addr(1)), None);
    }

    #[test]
    fn test_stale_entries_miss_and_expire() {
        let cache = ProviderMetadataCache::new(Duration::ZERO);
        cache.insert(addr(1), metadata("alpha"));
        cache.insert(addr(2), metadata("beta"));

        assert_eq!(cache.get(&addr(1)), None);
        assert_eq!(cache.stats().misses, 1);

        assert_eq!(cache.expire(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.expire(), 0);
    }

    #[test]
    fn test_from_config() {
        let cache = ProviderMetadataCache::from_config(&ProviderCacheConfig { ttl_seconds: 3600 });
        cache.insert(addr(1), metadata("alpha"));
        assert_eq!(cache.expire(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_annotate_roster() {
        let cache = ProviderMetadataCache::new(Duration::from_secs(60));
        cache.init([(addr(1), metadata("alpha"))]);

        let position = |provider| ProviderPosition {
            provider,
            active_delegations: 0,
            active_amount: TokenAmount::ZERO,
            registered_keys: 0,
            available_keys: 0,
            metadata: None,
        };
        let mut roster = vec![position(addr(1)), position(addr(2))];

        cache.annotate(&mut roster);
        assert_eq!(roster[0].metadata, Some(metadata("alpha")));
        assert_eq!(roster[1].metadata, None);
    }
}
