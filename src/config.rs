//! Configuration types for b2-vault

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};
use utoipa::ToSchema;

/// Hard upper bound the backend accepts for a single-request upload (5 GiB)
pub const BACKEND_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Storage backend credentials and endpoints
///
/// Credentials are supplied once at process configuration time and never per call.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct StorageConfig {
    /// Application key ID used for HTTP Basic authentication
    pub key_id: String,

    /// Application key secret (never logged, redacted from `Debug`)
    pub application_key: String,

    /// Bucket ID used by upload, list and download-authorization calls
    pub bucket_id: String,

    /// Bucket name used when composing download URLs
    pub bucket_name: String,

    /// Root of the account authorization API (default: B2 v2 API)
    #[serde(default = "default_auth_root")]
    pub auth_root: String,

    /// How long a fetched authorization is trusted (default: 23 hours)
    ///
    /// The backend states a 24 hour lifetime; the shorter window keeps requests
    /// away from the edge of expiry.
    #[serde(default = "default_authorization_ttl", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub authorization_ttl: Duration,

    /// Largest accepted upload in bytes (default: 5 GiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Per-request timeout for backend calls (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub request_timeout: Duration,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("key_id", &self.key_id)
            .field("application_key", &"<redacted>")
            .field("bucket_id", &self.bucket_id)
            .field("bucket_name", &self.bucket_name)
            .field("auth_root", &self.auth_root)
            .field("authorization_ttl", &self.authorization_ttl)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl StorageConfig {
    /// Largest upload actually accepted: the configured limit, never above
    /// what the backend takes in one request
    pub fn upload_limit(&self) -> u64 {
        self.max_upload_bytes.min(BACKEND_MAX_UPLOAD_BYTES)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            application_key: String::new(),
            bucket_id: String::new(),
            bucket_name: String::new(),
            auth_root: default_auth_root(),
            authorization_ttl: default_authorization_ttl(),
            max_upload_bytes: default_max_upload_bytes(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Retry configuration for transient backend failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one (default: 4)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Maximum delay between attempts (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Bulk export tuning
///
/// Batch size and inter-batch delay are throttling policy for the proxy and
/// backend, not correctness requirements.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ExportConfig {
    /// Files per batch (default: 5)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches (default: 100ms)
    #[serde(default = "default_batch_delay", with = "duration_millis_serde")]
    #[schema(value_type = u64)]
    pub batch_delay: Duration,

    /// Deflate level for the produced archive, 0-9 (default: 6)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Base URL of the same-origin download proxy (e.g. "https://app.example.com")
    #[serde(default)]
    pub proxy_base_url: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay: default_batch_delay(),
            compression_level: default_compression_level(),
            proxy_base_url: None,
        }
    }
}

/// REST API server configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Storage backend credentials and endpoints
    pub storage: StorageConfig,

    /// Retry policy for backend calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Bulk export tuning
    #[serde(default)]
    pub export: ExportConfig,

    /// REST API server settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Build a configuration from `B2_*` environment variables.
    ///
    /// Required: `B2_KEY_ID`, `B2_APPLICATION_KEY`, `B2_BUCKET_ID`, `B2_BUCKET_NAME`.
    /// Optional: `B2_AUTH_ROOT`, `B2_VAULT_PROXY_URL`.
    pub fn from_env() -> Result<Self> {
        fn required(key: &str) -> Result<String> {
            std::env::var(key).map_err(|_| Error::Config {
                message: format!("environment variable {key} is not set"),
                key: Some(key.to_string()),
            })
        }

        let mut config = Config {
            storage: StorageConfig {
                key_id: required("B2_KEY_ID")?,
                application_key: required("B2_APPLICATION_KEY")?,
                bucket_id: required("B2_BUCKET_ID")?,
                bucket_name: required("B2_BUCKET_NAME")?,
                ..Default::default()
            },
            ..Default::default()
        };

        if let Ok(root) = std::env::var("B2_AUTH_ROOT") {
            config.storage.auth_root = root;
        }
        if let Ok(proxy) = std::env::var("B2_VAULT_PROXY_URL") {
            config.export.proxy_base_url = Some(proxy);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: &str| Error::Config {
            message: message.to_string(),
            key: Some(key.to_string()),
        };

        if self.storage.key_id.is_empty() || self.storage.application_key.is_empty() {
            return Err(invalid("storage.key_id", "storage credentials must not be empty"));
        }
        if self.storage.bucket_id.is_empty() || self.storage.bucket_name.is_empty() {
            return Err(invalid("storage.bucket_id", "bucket id and name must not be empty"));
        }
        if self.storage.max_upload_bytes == 0
            || self.storage.max_upload_bytes > BACKEND_MAX_UPLOAD_BYTES
        {
            return Err(invalid(
                "storage.max_upload_bytes",
                "max upload size must be between 1 byte and 5 GiB",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", "at least one attempt is required"));
        }
        if self.export.batch_size == 0 {
            return Err(invalid("export.batch_size", "batch size must be at least 1"));
        }
        if self.export.compression_level > 9 {
            return Err(invalid(
                "export.compression_level",
                "compression level must be between 0 and 9",
            ));
        }
        Ok(())
    }
}

fn default_auth_root() -> String {
    "https://api.backblazeb2.com/b2api/v2".to_string()
}

fn default_authorization_ttl() -> Duration {
    Duration::from_secs(23 * 60 * 60)
}

fn default_max_upload_bytes() -> u64 {
    BACKEND_MAX_UPLOAD_BYTES
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_batch_size() -> usize {
    5
}

fn default_batch_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_compression_level() -> u32 {
    6
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Sub-second delays need millisecond resolution
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
