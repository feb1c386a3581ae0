//! Time-boxed key-value cache with family-indexed invalidation.
//!
//! Entries expire lazily: an expired entry is removed the next time it is
//! read, never by a background sweep. Each stored key whose prefix names a
//! [`CacheFamily`] is also recorded in a family index, so invalidating every
//! cached `roles` query costs one removal per affected key.

#[cfg(feature = "audit")]
use log::{debug, info};

use crate::{
    config::CacheConfig,
    error::{Error, Result},
    keys::CacheFamily,
    metrics::CacheMetrics,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use regex::Regex;
use std::collections::HashSet;

/// A stored value with its expiry metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached payload.
    pub data: V,
    /// When the entry was stored.
    pub stored_at: DateTime<Utc>,
    /// How long the entry stays fresh. Never negative.
    pub ttl: Duration,
    /// Family the key was indexed under, if any.
    pub family: Option<CacheFamily>,
}

impl<V> CacheEntry<V> {
    /// Create a new entry stored now. Negative TTLs are clamped to zero.
    pub fn new(data: V, ttl: Duration, family: Option<CacheFamily>) -> Self {
        Self {
            data,
            stored_at: Utc::now(),
            ttl: ttl.max(Duration::zero()),
            family,
        }
    }

    /// Whether the entry is stale at `now`. A zero TTL is stale immediately.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.ttl <= Duration::zero() || now - self.stored_at > self.ttl
    }

    /// Whether the entry is stale now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Process-wide TTL cache.
///
/// The key space is a [`DashMap`], so concurrent callers may read and write
/// any key. Two concurrent misses on the same key may both populate it; the
/// last write wins.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    family_index: DashMap<CacheFamily, HashSet<String>>,
    config: CacheConfig,
    metrics: CacheMetrics,
}

impl<V> Default for TtlCache<V>
where
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TtlCache<V>
where
    V: Clone,
{
    /// Create a cache with the default configuration (5 minute TTL).
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a cache with a custom configuration.
    ///
    /// A negative default TTL is clamped to zero when entries are stored.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            family_index: DashMap::new(),
            config,
            metrics: CacheMetrics::new(),
        }
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Counters for this cache instance.
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Get a copy of the value stored under `key` if it has not expired.
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired() {
                let data = entry.data.clone();
                drop(entry);
                self.record(CacheMetrics::record_hit);

                #[cfg(feature = "audit")]
                debug!("Cache hit for '{key}'");

                return Some(data);
            }

            // Release the shard lock before removing.
            drop(entry);
            if self.remove_if_expired(key) {
                self.record(CacheMetrics::record_expiration);

                #[cfg(feature = "audit")]
                debug!("Cache entry '{key}' expired");
            }
        }

        self.record(CacheMetrics::record_miss);
        None
    }

    /// Store `data` under `key` with the default TTL, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, data: V) {
        self.set_with_ttl(key, data, self.config.default_ttl);
    }

    /// Store `data` under `key` with an explicit TTL, replacing any previous entry.
    pub fn set_with_ttl(&self, key: impl Into<String>, data: V, ttl: Duration) {
        let key = key.into();
        let family = CacheFamily::from_key(&key);

        // Index while the entry's shard is still locked.
        let stored = self
            .entries
            .entry(key.clone())
            .insert(CacheEntry::new(data, ttl, family));
        if let Some(family) = family {
            self.family_index.entry(family).or_default().insert(key);
        }
        drop(stored);

        self.record(CacheMetrics::record_store);
    }

    /// Whether a fresh entry exists for `key`. Does not evict or count as a lookup.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Remove the entry for `key`. Returns whether anything was removed.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.remove_entry(key).is_some();
        if removed && self.config.enable_metrics {
            self.metrics.record_invalidations(1);
        }
        removed
    }

    /// Remove every key the regular expression matches.
    ///
    /// The pattern is searched anywhere in the key, so anchor it (`^users`)
    /// to restrict it to a prefix. Returns the number of removed entries.
    pub fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let matching: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| regex.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        let removed = matching
            .iter()
            .filter(|key| self.remove_entry(key).is_some())
            .count();

        if self.config.enable_metrics {
            self.metrics.record_invalidations(removed);
        }

        #[cfg(feature = "audit")]
        info!("Invalidated {removed} cache entries matching '{pattern}'");

        Ok(removed)
    }

    /// Remove every entry belonging to `family` using the family index.
    pub fn invalidate_family(&self, family: CacheFamily) -> usize {
        let Some((_, keys)) = self.family_index.remove(&family) else {
            return 0;
        };

        let mut removed = 0;
        for key in keys {
            // Keys re-stored under another family are left alone.
            if self
                .entries
                .remove_if(&key, |_, entry| entry.family == Some(family))
                .is_some()
            {
                removed += 1;
            }
        }

        if self.config.enable_metrics {
            self.metrics
                .record_family_invalidation(family.as_str(), removed);
        }

        #[cfg(feature = "audit")]
        info!("Invalidated {removed} '{family}' cache entries");

        removed
    }

    /// Remove all entries. Returns the number removed.
    ///
    /// Entries stored concurrently with the call may survive it.
    pub fn clear(&self) -> usize {
        let removed = self
            .keys()
            .iter()
            .filter(|key| self.remove_entry(key).is_some())
            .count();

        if self.config.enable_metrics {
            self.metrics.record_invalidations(removed);
        }

        #[cfg(feature = "audit")]
        info!("Cache cleared ({removed} entries)");

        removed
    }

    /// Remove all expired entries. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .map(|entry| entry.key().clone())
            .collect();

        let removed = expired
            .iter()
            .filter(|key| self.remove_if_expired(key))
            .count();

        if self.config.enable_metrics {
            self.metrics.record_expirations(removed);
        }

        removed
    }

    /// Number of stored entries, including ones that expired but were not read yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let total_entries = self.entries.len();
        let expired_entries = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired_at(now))
            .count();
        let indexed_families = self
            .family_index
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .count();

        CacheStats {
            total_entries,
            expired_entries,
            indexed_families,
            hit_ratio: self.metrics.hit_ratio(),
        }
    }

    // Private helper methods

    fn record(&self, f: fn(&CacheMetrics)) {
        if self.config.enable_metrics {
            f(&self.metrics);
        }
    }

    fn remove_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.remove_locked(key, |_| true)
    }

    fn remove_if_expired(&self, key: &str) -> bool {
        self.remove_locked(key, CacheEntry::is_expired).is_some()
    }

    /// Remove `key` and its index record under the entry's shard lock, so a
    /// concurrent `set` of the same key keeps its own index record.
    fn remove_locked(
        &self,
        key: &str,
        predicate: impl FnOnce(&CacheEntry<V>) -> bool,
    ) -> Option<CacheEntry<V>> {
        let Entry::Occupied(occupied) = self.entries.entry(key.to_string()) else {
            return None;
        };
        if !predicate(occupied.get()) {
            return None;
        }

        if let Some(family) = occupied.get().family {
            self.unindex(key, family);
        }
        Some(occupied.remove())
    }

    fn unindex(&self, key: &str, family: CacheFamily) {
        if let Some(mut keys) = self.family_index.get_mut(&family) {
            keys.remove(key);
            if keys.is_empty() {
                drop(keys);
                self.family_index.remove_if(&family, |_, keys| keys.is_empty());
            }
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Total number of stored entries.
    pub total_entries: usize,
    /// Stored entries whose TTL has elapsed but were not evicted yet.
    pub expired_entries: usize,
    /// Number of families with at least one indexed key.
    pub indexed_families: usize,
    /// Lifetime hit ratio of this cache.
    pub hit_ratio: f64,
}

/// Entity-scoped invalidation, called after a successful mutation so stale
/// list and stats queries are never served past a write.
pub trait CacheInvalidation {
    /// Invalidate every cached entry of a family.
    fn invalidate_family_cache(&self, family: CacheFamily) -> usize;

    /// Invalidate cached role queries.
    fn invalidate_roles_cache(&self) -> usize {
        self.invalidate_family_cache(CacheFamily::Roles)
    }

    /// Invalidate cached user queries.
    fn invalidate_users_cache(&self) -> usize {
        self.invalidate_family_cache(CacheFamily::Users)
    }

    /// Invalidate cached permission queries.
    fn invalidate_permissions_cache(&self) -> usize {
        self.invalidate_family_cache(CacheFamily::Permissions)
    }

    /// Invalidate cached module queries.
    fn invalidate_modules_cache(&self) -> usize {
        self.invalidate_family_cache(CacheFamily::Modules)
    }

    /// Invalidate cached client queries.
    fn invalidate_clients_cache(&self) -> usize {
        self.invalidate_family_cache(CacheFamily::Clients)
    }

    /// Invalidate cached dashboard analytics.
    fn invalidate_dashboard_cache(&self) -> usize {
        self.invalidate_family_cache(CacheFamily::Dashboard)
    }
}

impl<V> CacheInvalidation for TtlCache<V>
where
    V: Clone,
{
    fn invalidate_family_cache(&self, family: CacheFamily) -> usize {
        self.invalidate_family(family)
    }
}
