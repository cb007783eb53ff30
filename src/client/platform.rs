//! HTTP implementation of the platform API

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;

use super::{PlatformApi, resource_path};
use crate::cache::ResourceClass;
use crate::error::{ApiError, Result};

/// Default API base URL
pub const API_BASE_URL: &str = "https://api-app2.virtuoso.qa/api";

/// Requests per second allowed against the platform
const RATE_LIMIT_PER_SECOND: u32 = 6;

/// Platform API client authenticated with a bearer token
pub struct PlatformClient {
    http: HttpClient,
    base_url: String,
    token: String,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl PlatformClient {
    /// Create a client. `api_host` overrides the default base URL.
    pub fn new(token: String, api_host: Option<&str>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("journeyvault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let quota = Quota::per_second(
            NonZeroU32::new(RATE_LIMIT_PER_SECOND).unwrap_or(NonZeroU32::MIN),
        );

        let base_url = match api_host {
            Some(host) => format!("{}/api", host.trim_end_matches('/')),
            None => API_BASE_URL.to_string(),
        };

        Ok(Self {
            http,
            base_url,
            token,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    #[cfg(test)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, tenant_id: &str, path: &str) -> Result<Value> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .header("X-Organization-Id", tenant_id)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let data = response.json::<Value>().await.map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to parse response: {}", e))
                })?;
                Ok(data)
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized.into()),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden.into()),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path.to_string()).into()),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                Err(ApiError::RateLimit(Duration::from_secs(retry_after)).into())
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Bad request".to_string());
                Err(ApiError::BadRequest(error_msg).into())
            }
            status if status.is_server_error() => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("Server error: {}", status));
                Err(ApiError::ServerError(error_msg).into())
            }
            _ => Err(ApiError::InvalidResponse(format!("Unexpected status code: {}", status)).into()),
        }
    }
}

#[async_trait]
impl PlatformApi for PlatformClient {
    async fn fetch_resource(
        &self,
        tenant_id: &str,
        class: ResourceClass,
        resource_id: &str,
    ) -> Result<Value> {
        self.get_json(tenant_id, &resource_path(class, resource_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_default_base_url() {
        let client = PlatformClient::new("token".to_string(), None).unwrap();
        assert_eq!(client.base_url(), API_BASE_URL);
    }

    #[test]
    fn test_api_host_override_strips_trailing_slash() {
        let client =
            PlatformClient::new("token".to_string(), Some("http://localhost:1234/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234/api");
    }

    #[tokio::test]
    async fn test_fetch_sends_tenant_header_and_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/projects/4889")
            .match_header("authorization", "Bearer secret")
            .match_header("x-organization-id", "1964")
            .with_status(200)
            .with_body(r#"{"id": 4889, "name": "Demo"}"#)
            .create_async()
            .await;

        let client = PlatformClient::new("secret".to_string(), Some(&server.url())).unwrap();
        let value = client
            .fetch_resource("1964", ResourceClass::Project, "4889")
            .await
            .unwrap();

        assert_eq!(value["name"], "Demo");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_maps_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/executions/1")
            .with_status(404)
            .create_async()
            .await;

        let client = PlatformClient::new("t".to_string(), Some(&server.url())).unwrap();
        let err = client
            .fetch_resource("1964", ResourceClass::Execution, "1")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_maps_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/environments/9")
            .with_status(401)
            .create_async()
            .await;

        let client = PlatformClient::new("bad".to_string(), Some(&server.url())).unwrap();
        let err = client
            .fetch_resource("1964", ResourceClass::Environment, "9")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::Unauthorized)));
    }
}
