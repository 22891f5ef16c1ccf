//! Connection descriptor for the two platform APIs.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MAX_TOKEN_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_EXPIRY_BUFFER_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ORIGIN: &str = "ldap";

/// Environment file contents: endpoints, client credentials and tuning.
#[derive(Clone, Serialize, Deserialize)]
pub struct Environment {
    /// Identity provider base URL.
    pub uaa_url: String,
    /// Resource manager base URL.
    pub api_url: String,
    /// Defaults to `<uaa_url>/oauth/token`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    /// Account origin used for lookups and creations.
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_max_token_retries")]
    pub max_token_retries: u32,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    #[serde(default = "default_expiry_buffer_secs")]
    pub expiry_buffer_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Opt-out of certificate validation. Off unless explicitly set.
    #[serde(default)]
    pub skip_tls_verification: bool,
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_owned()
}

fn default_max_token_retries() -> u32 {
    DEFAULT_MAX_TOKEN_RETRIES
}

fn default_retry_interval_secs() -> u64 {
    DEFAULT_RETRY_INTERVAL_SECS
}

fn default_expiry_buffer_secs() -> u64 {
    DEFAULT_EXPIRY_BUFFER_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("uaa_url", &self.uaa_url)
            .field("api_url", &self.api_url)
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("origin", &self.origin)
            .field("max_token_retries", &self.max_token_retries)
            .field("retry_interval_secs", &self.retry_interval_secs)
            .field("expiry_buffer_secs", &self.expiry_buffer_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("skip_tls_verification", &self.skip_tls_verification)
            .finish()
    }
}

impl Environment {
    /// Reject descriptors missing a required setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("uaa_url", &self.uaa_url),
            ("api_url", &self.api_url),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("origin", &self.origin),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingSetting { key });
            }
        }
        Ok(())
    }

    pub fn uaa_base(&self) -> &str {
        self.uaa_url.trim_end_matches('/')
    }

    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn token_url(&self) -> String {
        match self.token_endpoint.as_deref() {
            Some(endpoint) if !endpoint.trim().is_empty() => endpoint.trim().to_string(),
            _ => format!("{}/oauth/token", self.uaa_base()),
        }
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn expiry_buffer(&self) -> Duration {
        Duration::from_secs(self.expiry_buffer_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
