//! Read-through wrapper around any `PlatformApi`
//!
//! The cache itself never fetches. This wrapper is the caller that checks it,
//! fetches on a miss and writes the result back.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::{ResourceClass, ResponseCache};
use crate::client::PlatformApi;
use crate::error::{ApiError, Error, Result};

/// Cached wrapper for any PlatformApi implementation.
///
/// Force-fresh behaviour comes from the shared `ResponseCache`.
pub struct CachedPlatformClient<C: PlatformApi> {
    inner: Arc<C>,
    cache: Arc<ResponseCache>,
}

impl<C: PlatformApi> CachedPlatformClient<C> {
    pub fn new(inner: C, cache: Arc<ResponseCache>) -> Self {
        Self {
            inner: Arc::new(inner),
            cache,
        }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Start an extraction pass for a tenant: volatile classes are fetched
    /// again, stable ones keep their entries.
    pub fn begin_pass(&self, tenant_id: &str) -> usize {
        let purged = self.cache.purge_volatile(tenant_id);
        if purged > 0 {
            log::debug!("Purged {} volatile entries for tenant {}", purged, tenant_id);
        }
        purged
    }
}

#[async_trait]
impl<C: PlatformApi + 'static> PlatformApi for CachedPlatformClient<C> {
    async fn fetch_resource(
        &self,
        tenant_id: &str,
        class: ResourceClass,
        resource_id: &str,
    ) -> Result<Value> {
        if let Some(cached) = self.cache.get(tenant_id, class, resource_id) {
            log::debug!("Cache hit: {}/{}", class, resource_id);
            return Ok(cached.as_ref().clone());
        }

        let value = match self.inner.fetch_resource(tenant_id, class, resource_id).await {
            Ok(value) => value,
            Err(Error::Api(ApiError::NotFound(path))) => {
                // Gone upstream; a copy kept through a force-fresh refetch is stale.
                if self.cache.invalidate(tenant_id, class, resource_id) {
                    log::debug!("Invalidated {}/{} after upstream 404", class, resource_id);
                }
                return Err(ApiError::NotFound(path).into());
            }
            Err(e) => return Err(e),
        };
        self.cache.put(tenant_id, class, resource_id, value.clone())?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheLimits, NamespacePolicy};
    use crate::client::MockPlatformClient;
    use crate::clock::ManualClock;
    use serde_json::json;
    use std::time::Duration;

    fn create_test_client(
        force_fresh: bool,
    ) -> (CachedPlatformClient<MockPlatformClient>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::epoch());
        let cache = ResponseCache::new(
            NamespacePolicy::default(),
            CacheLimits::default(),
            clock.clone(),
        )
        .with_force_fresh(force_fresh);

        let mock = MockPlatformClient::new()
            .with_resource("1964", ResourceClass::Project, "4889", json!({"name": "Demo"}))
            .with_resource("1964", ResourceClass::Execution, "88715", json!({"status": "PASS"}))
            .with_resource("2000", ResourceClass::Project, "4889", json!({"name": "Other"}))
            .with_resource("1964", ResourceClass::TestCatalog, "4889", json!({"suites": 3}));

        (CachedPlatformClient::new(mock, Arc::new(cache)), clock)
    }

    #[tokio::test]
    async fn test_project_fetched_once() {
        let (client, _clock) = create_test_client(false);

        let first = client
            .fetch_resource("1964", ResourceClass::Project, "4889")
            .await
            .unwrap();
        let second = client
            .fetch_resource("1964", ResourceClass::Project, "4889")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(
            client
                .inner
                .call_count("1964", ResourceClass::Project, "4889")
                .await,
            1
        );
        assert_eq!(client.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_execution_always_fetched() {
        let (client, _clock) = create_test_client(false);

        for _ in 0..3 {
            client
                .fetch_resource("1964", ResourceClass::Execution, "88715")
                .await
                .unwrap();
        }

        assert_eq!(
            client
                .inner
                .call_count("1964", ResourceClass::Execution, "88715")
                .await,
            3
        );
    }

    #[tokio::test]
    async fn test_tenants_do_not_share_entries() {
        let (client, _clock) = create_test_client(false);

        let a = client
            .fetch_resource("1964", ResourceClass::Project, "4889")
            .await
            .unwrap();
        let b = client
            .fetch_resource("2000", ResourceClass::Project, "4889")
            .await
            .unwrap();

        assert_eq!(a["name"], "Demo");
        assert_eq!(b["name"], "Other");
    }

    #[tokio::test]
    async fn test_expired_entry_refetched() {
        let (client, clock) = create_test_client(false);

        client
            .fetch_resource("1964", ResourceClass::Project, "4889")
            .await
            .unwrap();
        clock.advance(Duration::from_secs(2 * 60 * 60));
        client
            .fetch_resource("1964", ResourceClass::Project, "4889")
            .await
            .unwrap();

        assert_eq!(
            client
                .inner
                .call_count("1964", ResourceClass::Project, "4889")
                .await,
            2
        );
    }

    #[tokio::test]
    async fn test_force_fresh_bypasses_cache() {
        let (client, _clock) = create_test_client(true);

        let _ = client
            .fetch_resource("1964", ResourceClass::Project, "4889")
            .await;
        let _ = client
            .fetch_resource("1964", ResourceClass::Project, "4889")
            .await;

        assert_eq!(
            client
                .inner
                .call_count("1964", ResourceClass::Project, "4889")
                .await,
            2
        );
        assert_eq!(client.cache().stats().entry_count, 1);
    }

    #[tokio::test]
    async fn test_upstream_error_not_cached() {
        let (client, _clock) = create_test_client(false);

        assert!(client
            .fetch_resource("1964", ResourceClass::Environment, "missing")
            .await
            .is_err());
        assert_eq!(client.cache().stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_begin_pass_refetches_volatile_only() {
        let (client, _clock) = create_test_client(false);

        for _ in 0..2 {
            client.begin_pass("1964");
            client
                .fetch_resource("1964", ResourceClass::Project, "4889")
                .await
                .unwrap();
            client
                .fetch_resource("1964", ResourceClass::TestCatalog, "4889")
                .await
                .unwrap();
        }

        assert_eq!(
            client
                .inner
                .call_count("1964", ResourceClass::Project, "4889")
                .await,
            1
        );
        assert_eq!(
            client
                .inner
                .call_count("1964", ResourceClass::TestCatalog, "4889")
                .await,
            2
        );
    }

    #[tokio::test]
    async fn test_begin_pass_leaves_other_tenants() {
        let (client, _clock) = create_test_client(false);
        client
            .cache()
            .put("2000", ResourceClass::TestCatalog, "1", json!({"suites": 1}))
            .unwrap();

        assert_eq!(client.begin_pass("1964"), 0);
        assert_eq!(client.cache().stats().entry_count, 1);
    }

    #[tokio::test]
    async fn test_not_found_drops_stale_entry() {
        let (client, _clock) = create_test_client(true);
        client
            .cache()
            .put("1964", ResourceClass::Environment, "retired", json!({"name": "Old"}))
            .unwrap();

        let err = client
            .fetch_resource("1964", ResourceClass::Environment, "retired")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::NotFound(_))));
        assert_eq!(client.cache().stats().entry_count, 0);
    }
}
