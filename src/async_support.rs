//! Async support (requires the `async` feature).
//!
//! Provides an async read-through service for collaborators whose queries are
//! futures, and a shareable evaluator for request handlers running on tokio.

use crate::{
    cache::{CacheInvalidation, TtlCache},
    error::Result,
    evaluator::{AccessEvaluator, LoadState},
    guard::{AccessRequirement, AccessResult},
    keys::CacheFamily,
    metrics::FetchTimer,
    registry::ModuleRegistry,
    service::{Mutation, QueryDescriptor},
    user::User,
};
use chrono::Duration;
use std::{future::Future, sync::Arc};
use tokio::sync::RwLock;

#[cfg(feature = "audit")]
use log::{info, warn};

/// Async backend query collaborator invoked on a cache miss.
pub trait AsyncQueryFetcher<V>: Send + Sync {
    /// Run the query against the backing data store.
    fn fetch(&self, query: &QueryDescriptor) -> impl Future<Output = Result<V>> + Send;
}

/// Async read-through cache over an [`AsyncQueryFetcher`].
///
/// Concurrent misses on the same key are not coalesced: each caller fetches
/// and the last store wins.
pub struct AsyncManagementCacheService<V, F> {
    cache: Arc<TtlCache<V>>,
    fetcher: F,
}

impl<V, F> AsyncManagementCacheService<V, F>
where
    V: Clone + Send + Sync,
    F: AsyncQueryFetcher<V>,
{
    /// Create a service over a fresh cache with the default configuration.
    pub fn new(fetcher: F) -> Self {
        Self::with_cache(Arc::new(TtlCache::new()), fetcher)
    }

    /// Create a service over an existing cache.
    pub fn with_cache(cache: Arc<TtlCache<V>>, fetcher: F) -> Self {
        Self { cache, fetcher }
    }

    /// The underlying cache.
    pub fn cache(&self) -> &Arc<TtlCache<V>> {
        &self.cache
    }

    /// Serve a query from the cache, fetching and storing it on a miss.
    pub async fn load(&self, query: &QueryDescriptor) -> Result<V> {
        self.load_with_ttl(query, self.cache.config().default_ttl)
            .await
    }

    /// Like [`load`](Self::load) with an explicit TTL for the stored result.
    pub async fn load_with_ttl(&self, query: &QueryDescriptor, ttl: Duration) -> Result<V> {
        let key = query.cache_key()?;
        if let Some(data) = self.cache.get(&key) {
            return Ok(data);
        }

        let timer = FetchTimer::start(self.cache.metrics());
        let result = self.fetcher.fetch(query).await;
        timer.finish(result.is_ok());

        let data = match result {
            Ok(data) => data,
            Err(error) => {
                #[cfg(feature = "audit")]
                warn!("Fetch for '{key}' failed, nothing cached: {error}");

                return Err(error);
            }
        };

        self.cache.set_with_ttl(key, data.clone(), ttl);
        Ok(data)
    }

    /// Invalidate the family a successful write touched.
    pub fn notify_mutation(&self, mutation: &Mutation) -> usize {
        let removed = self.cache.invalidate_family(mutation.family);

        #[cfg(feature = "audit")]
        info!(
            "{:?} on {} ({}) invalidated {removed} cache entries",
            mutation.kind,
            mutation.family,
            mutation.entity_id.as_deref().unwrap_or("-")
        );

        removed
    }
}

impl<V, F> CacheInvalidation for AsyncManagementCacheService<V, F>
where
    V: Clone + Send + Sync,
    F: AsyncQueryFetcher<V>,
{
    fn invalidate_family_cache(&self, family: CacheFamily) -> usize {
        self.cache.invalidate_family(family)
    }
}

/// Async wrapper sharing one session evaluator between tasks.
pub struct SharedAccessEvaluator<R>
where
    R: ModuleRegistry,
{
    inner: Arc<RwLock<AccessEvaluator<R>>>,
}

impl<R> Clone for SharedAccessEvaluator<R>
where
    R: ModuleRegistry,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> SharedAccessEvaluator<R>
where
    R: ModuleRegistry,
{
    /// Wrap an evaluator.
    pub fn new(evaluator: AccessEvaluator<R>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(evaluator)),
        }
    }

    /// Load (or replace) the session user.
    pub async fn load_user(&self, user: User) -> LoadState {
        let mut evaluator = self.inner.write().await;
        evaluator.load_user(user)
    }

    /// Drop the session user.
    pub async fn unload(&self) {
        let mut evaluator = self.inner.write().await;
        evaluator.unload();
    }

    /// Recompute accessible modules after the registry changed.
    pub async fn refresh_modules(&self) {
        let mut evaluator = self.inner.write().await;
        evaluator.refresh_modules();
    }

    pub async fn permissions_loaded(&self) -> bool {
        self.inner.read().await.permissions_loaded()
    }

    pub async fn has_permission(&self, permission: &str) -> bool {
        self.inner.read().await.has_permission(permission)
    }

    pub async fn has_module_access(&self, module: &str) -> bool {
        self.inner.read().await.has_module_access(module)
    }

    pub async fn has_role(&self, role_name: &str) -> bool {
        self.inner.read().await.has_role(role_name)
    }

    pub async fn has_any_role<S: AsRef<str>>(&self, role_names: &[S]) -> bool {
        self.inner.read().await.has_any_role(role_names)
    }

    pub async fn is_admin(&self) -> bool {
        self.inner.read().await.is_admin()
    }

    pub async fn is_super_admin(&self) -> bool {
        self.inner.read().await.is_super_admin()
    }

    /// Evaluate a requirement.
    pub async fn check(&self, requirement: &AccessRequirement) -> AccessResult {
        self.inner.read().await.check(requirement)
    }

    /// Batch-evaluate requirements under a single read lock.
    pub async fn check_all(&self, requirements: &[AccessRequirement]) -> Vec<AccessResult> {
        let evaluator = self.inner.read().await;
        requirements
            .iter()
            .map(|requirement| evaluator.check(requirement))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, role::Role};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct SlowFetcher {
        calls: AtomicUsize,
    }

    impl AsyncQueryFetcher<String> for SlowFetcher {
        async fn fetch(&self, query: &QueryDescriptor) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            if query.family == CacheFamily::Dashboard {
                return Err(Error::fetch("dashboard:stats", "timeout"));
            }
            query.cache_key()
        }
    }

    #[tokio::test]
    async fn test_async_read_through() {
        let service = AsyncManagementCacheService::new(SlowFetcher::default());
        let query = QueryDescriptor::stats(CacheFamily::Roles);

        assert_eq!(service.load(&query).await.unwrap(), "roles:stats");
        assert_eq!(service.load(&query).await.unwrap(), "roles:stats");
        assert_eq!(service.fetcher.calls.load(Ordering::SeqCst), 1);

        let removed = service.notify_mutation(&Mutation::deleted(CacheFamily::Roles, "r-1"));
        assert_eq!(removed, 1);
        assert_eq!(service.cache().metrics().summary().invalidations, 1);
        service.load(&query).await.unwrap();
        assert_eq!(service.fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_async_failures_are_not_cached() {
        let service = AsyncManagementCacheService::new(SlowFetcher::default());
        let query = QueryDescriptor::stats(CacheFamily::Dashboard);

        assert!(service.load(&query).await.is_err());
        assert!(service.load(&query).await.is_err());
        assert!(service.cache().is_empty());
        assert_eq!(service.fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_shared_evaluator() {
        let shared = SharedAccessEvaluator::new(AccessEvaluator::new());
        assert!(!shared.permissions_loaded().await);

        let handle = shared.clone();
        tokio::spawn(async move {
            handle
                .load_user(User::new("u1").with_roles(vec![
                    Role::new("manager").add_permission("clients.read"),
                ]))
                .await
        })
        .await
        .unwrap();

        assert!(shared.permissions_loaded().await);
        assert!(shared.has_permission("clients.read").await);
        assert!(shared.has_any_role(&["manager"]).await);
        assert!(!shared.is_admin().await);

        let results = shared
            .check_all(&[
                AccessRequirement::new().permission("clients.read"),
                AccessRequirement::new().admin(),
            ])
            .await;
        assert!(results[0].is_granted());
        assert!(results[1].is_denied());

        shared.unload().await;
        assert!(shared.check(&AccessRequirement::new()).await.is_pending());
    }
}
