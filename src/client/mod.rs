//! Upstream test-automation platform client

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::ResourceClass;
use crate::error::Result;

#[cfg(test)]
pub mod mock;
pub mod platform;

#[cfg(test)]
pub use mock::MockPlatformClient;
pub use platform::PlatformClient;

/// Resource fetcher the cache wraps.
///
/// Implementations never retry; retry policy belongs to whoever drives them.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Fetch one resource for a tenant
    async fn fetch_resource(
        &self,
        tenant_id: &str,
        class: ResourceClass,
        resource_id: &str,
    ) -> Result<Value>;
}

/// API path for a resource, relative to the API base URL
pub fn resource_path(class: ResourceClass, resource_id: &str) -> String {
    match class {
        ResourceClass::Project => format!("/projects/{}", resource_id),
        ResourceClass::Environment => format!("/environments/{}", resource_id),
        ResourceClass::TestCatalog => format!("/projects/{}/testsuites", resource_id),
        ResourceClass::Journey => format!("/testsuites/{}", resource_id),
        ResourceClass::Execution => format!("/executions/{}", resource_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_paths() {
        assert_eq!(
            resource_path(ResourceClass::Project, "4889"),
            "/projects/4889"
        );
        assert_eq!(
            resource_path(ResourceClass::TestCatalog, "4889"),
            "/projects/4889/testsuites"
        );
        assert_eq!(
            resource_path(ResourceClass::Journey, "527218"),
            "/testsuites/527218"
        );
        assert_eq!(
            resource_path(ResourceClass::Execution, "88715"),
            "/executions/88715"
        );
    }
}
