//! Typed configuration for the tokeninfo service.

use secrecy::Secret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::duration::parse_duration;

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub openid: OpenIdConfig,
    pub revocation: RevocationConfig,
    pub http_client: HttpClientConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// `host:port` form, matching `LISTEN_ADDRESS`'s `":9021"` style default.
    pub listen_address: String,
    pub metrics_listen_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpstreamConfig {
    #[validate(url)]
    pub tokeninfo_url: String,
    pub cache_max_size: usize,
    #[serde(deserialize_with = "deserialize_duration")]
    pub cache_ttl: Duration,
    pub uuid_tokens: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenIdConfig {
    #[validate(url)]
    pub provider_configuration_url: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub refresh_interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RevocationConfig {
    #[validate(url)]
    pub provider_url: String,
    #[serde(deserialize_with = "deserialize_duration")]
    pub provider_refresh_interval: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub cache_ttl: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub refresh_tolerance: Duration,
    /// Required outside development; enforced in `validate_for_environment`
    /// rather than via `#[validate]`, since the requirement is conditional.
    #[serde(skip_serializing)]
    pub hashing_salt: Option<Secret<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HttpClientConfig {
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub tls_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_address: ":9021".to_string(),
                metrics_listen_address: ":9020".to_string(),
            },
            upstream: UpstreamConfig {
                tokeninfo_url: String::new(),
                cache_max_size: 10_000,
                cache_ttl: Duration::from_secs(60),
                uuid_tokens: false,
            },
            openid: OpenIdConfig {
                provider_configuration_url: String::new(),
                refresh_interval: Duration::from_secs(30),
            },
            revocation: RevocationConfig {
                provider_url: String::new(),
                provider_refresh_interval: Duration::from_secs(10),
                cache_ttl: Duration::from_secs(30 * 86400),
                refresh_tolerance: Duration::from_secs(60),
                hashing_salt: None,
            },
            http_client: HttpClientConfig {
                timeout: Duration::from_secs(10),
                tls_timeout: Duration::from_secs(10),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
