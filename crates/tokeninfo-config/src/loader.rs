//! Configuration loading: files layered with environment variables, the
//! environment variables always winning — matching the teacher's
//! `ConfigLoader` (`File::with_name(...).required(false)` layers plus an
//! `Environment` source), adapted to this service's flat
//! `UPSTREAM_TOKENINFO_URL`-style env-var names instead of the teacher's
//! nested `AUTH__SERVER__PORT` convention.

use crate::config::AppConfig;
use anyhow::{Context, Result};
use config::{Config, Environment, File};

pub struct ConfigLoader {
    config_dir: String,
    environment: String,
}

impl ConfigLoader {
    pub fn new(config_dir: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            config_dir: config_dir.into(),
            environment: environment.into(),
        }
    }

    /// Loads defaults from `<config_dir>/default.*` and `<config_dir>/<environment>.*`
    /// (both optional), then overlays the flat env vars named in spec §6,
    /// mapped onto the nested `AppConfig` shape, then validates required
    /// fields are present. Fails fast (returns `Err`) rather than starting
    /// with an incomplete configuration, matching
    /// `options.go`'s `log.Fatal` on a missing upstream/provider URL.
    pub fn load(&self) -> Result<AppConfig> {
        let builder = Config::builder()
            .add_source(File::with_name(&format!("{}/default", self.config_dir)).required(false))
            .add_source(
                File::with_name(&format!("{}/{}", self.config_dir, self.environment))
                    .required(false),
            )
            .set_default("server.listen_address", ":9021")?
            .set_default("server.metrics_listen_address", ":9020")?
            .set_default("upstream.cache_max_size", 10_000)?
            .set_default("upstream.cache_ttl", "60s")?
            .set_default("upstream.uuid_tokens", false)?
            .set_default("openid.refresh_interval", "30s")?
            .set_default("revocation.provider_refresh_interval", "10s")?
            .set_default("revocation.cache_ttl", "30d")?
            .set_default("revocation.refresh_tolerance", "60s")?
            .set_default("http_client.timeout", "10s")?
            .set_default("http_client.tls_timeout", "10s")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_override_option(
                "upstream.tokeninfo_url",
                std::env::var("UPSTREAM_TOKENINFO_URL").ok(),
            )?
            .set_override_option(
                "upstream.cache_max_size",
                std::env::var("UPSTREAM_CACHE_MAX_SIZE").ok(),
            )?
            .set_override_option("upstream.cache_ttl", std::env::var("UPSTREAM_CACHE_TTL").ok())?
            .set_override_option(
                "upstream.uuid_tokens",
                std::env::var("UPSTREAM_UUID_TOKENS").ok(),
            )?
            .set_override_option(
                "openid.provider_configuration_url",
                std::env::var("OPENID_PROVIDER_CONFIGURATION_URL").ok(),
            )?
            .set_override_option(
                "openid.refresh_interval",
                std::env::var("OPENID_PROVIDER_REFRESH_INTERVAL").ok(),
            )?
            .set_override_option(
                "revocation.provider_url",
                std::env::var("REVOCATION_PROVIDER_URL").ok(),
            )?
            .set_override_option(
                "revocation.provider_refresh_interval",
                std::env::var("REVOCATION_PROVIDER_REFRESH_INTERVAL").ok(),
            )?
            .set_override_option(
                "revocation.cache_ttl",
                std::env::var("REVOCATION_CACHE_TTL").ok(),
            )?
            .set_override_option(
                "revocation.refresh_tolerance",
                std::env::var("REVOCATION_REFRESH_TOLERANCE").ok(),
            )?
            .set_override_option(
                "revocation.hashing_salt",
                std::env::var("REVOCATION_HASHING_SALT").ok(),
            )?
            .set_override_option(
                "http_client.timeout",
                std::env::var("HTTP_CLIENT_TIMEOUT").ok(),
            )?
            .set_override_option(
                "http_client.tls_timeout",
                std::env::var("HTTP_CLIENT_TLS_TIMEOUT").ok(),
            )?
            .set_override_option("server.listen_address", std::env::var("LISTEN_ADDRESS").ok())?
            .set_override_option(
                "server.metrics_listen_address",
                std::env::var("METRICS_LISTEN_ADDRESS").ok(),
            )?
            .add_source(Environment::with_prefix("TOKENINFO").separator("__").try_parsing(true));

        let config: AppConfig = builder
            .build()
            .context("failed to assemble configuration sources")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        crate::validation::validate(&config)?;
        Ok(config)
    }
}
