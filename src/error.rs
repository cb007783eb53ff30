//! Error types for JourneyVault

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::retention::strategy::STRATEGY_NAMES;

/// Result type alias for JourneyVault operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Retention(#[from] RetentionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// Upstream platform errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed. Check `api_token` in your journeyvault config.")]
    Unauthorized,

    #[error("Access denied. You don't have permission to access this resource.")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("API token not configured. Set `api_token` in your journeyvault config.")]
    MissingApiToken,

    #[error("Tenant not configured. Pass --tenant or set `tenant_id` in your config.")]
    MissingTenant,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Response cache errors. Misses, expiry and eviction are not errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

/// Retention engine errors
#[derive(Debug, Error)]
pub enum RetentionError {
    #[error(
        "Out-of-order record for journey '{journey_id}': execution {execution_id} started at \
         {started_at}, before last evaluated record at {last_started_at}"
    )]
    OutOfOrderRecord {
        journey_id: String,
        execution_id: u64,
        started_at: DateTime<Utc>,
        last_started_at: DateTime<Utc>,
    },

    #[error(
        "Unknown retention strategy '{0}' (expected {expected})",
        expected = STRATEGY_NAMES.join(", ")
    )]
    UnknownStrategy(String),

    #[error("Record for journey '{found}' passed to rebuild of journey '{expected}'")]
    JourneyMismatch { expected: String, found: String },
}

/// Persistence-layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error at {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Corrupt record at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
