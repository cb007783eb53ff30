//! Mock platform client for testing
//!
//! Serves canned resources and counts how often each was requested, so tests
//! can tell cache hits from upstream fetches.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::PlatformApi;
use crate::cache::ResourceClass;
use crate::error::{ApiError, Result};

type ResourceKey = (String, ResourceClass, String);

/// Mock API client for testing.
///
/// # Example
/// ```ignore
/// let mock = MockPlatformClient::new()
///     .with_resource("1964", ResourceClass::Project, "4889", json!({"name": "Demo"}));
/// ```
#[derive(Default)]
pub struct MockPlatformClient {
    resources: HashMap<ResourceKey, Value>,
    calls: Arc<Mutex<HashMap<ResourceKey, usize>>>,
}

impl MockPlatformClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(
        mut self,
        tenant_id: &str,
        class: ResourceClass,
        resource_id: &str,
        value: Value,
    ) -> Self {
        self.resources.insert(
            (tenant_id.to_string(), class, resource_id.to_string()),
            value,
        );
        self
    }

    /// Number of upstream fetches for one resource
    pub async fn call_count(&self, tenant_id: &str, class: ResourceClass, resource_id: &str) -> usize {
        let calls = self.calls.lock().await;
        calls
            .get(&(tenant_id.to_string(), class, resource_id.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl PlatformApi for MockPlatformClient {
    async fn fetch_resource(
        &self,
        tenant_id: &str,
        class: ResourceClass,
        resource_id: &str,
    ) -> Result<Value> {
        let key = (tenant_id.to_string(), class, resource_id.to_string());
        *self.calls.lock().await.entry(key.clone()).or_insert(0) += 1;

        self.resources
            .get(&key)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("{}/{}", class, resource_id)).into())
    }
}
