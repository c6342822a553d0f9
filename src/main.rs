//! Main application entry point for the tokeninfo service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use secrecy::Secret;
use tracing::info;

use tokeninfo_api::AppState;
use tokeninfo_config::ConfigLoader;
use tokeninfo_core::{
    http_client::HttpClient,
    jwks::KeyLoader,
    jwt_validator::ProjectorRegistry,
    proxy::ProxyCache,
    resilience::CircuitBreakerRegistry,
    revocation::{RevocationCache, RevocationPuller},
    scheduler, JwtValidator,
};
use tokeninfo_platform::shutdown_signal;
use tokeninfo_telemetry::Metrics;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    tokeninfo_telemetry::init_logging("info", "pretty").ok();

    info!("starting tokeninfo service");

    let config = ConfigLoader::new("config", &environment)
        .load()
        .context("failed to load configuration")?;
    info!(environment, "configuration loaded");

    let metrics = Arc::new(Metrics::new());
    let breakers = Arc::new(CircuitBreakerRegistry::new(5, Duration::from_secs(30), metrics.clone()));
    let http = Arc::new(
        HttpClient::new(
            config.http_client.tls_timeout,
            config.http_client.timeout,
            breakers,
            metrics.clone(),
        )
        .context("failed to build outbound HTTP client")?,
    );

    let key_loader = Arc::new(KeyLoader::new(
        http.clone(),
        config.openid.provider_configuration_url.clone(),
        metrics.clone(),
    ));

    let hashing_salt = config
        .revocation
        .hashing_salt
        .clone()
        .unwrap_or_else(|| Secret::new(String::new()));
    let revocation = Arc::new(RevocationCache::new(hashing_salt));

    let revocation_puller = RevocationPuller::new(
        revocation.clone(),
        http.clone(),
        config.revocation.provider_url.clone(),
        config.revocation.refresh_tolerance.as_secs() as i64,
        config.revocation.cache_ttl.as_secs() as i64,
        metrics.clone(),
    );

    let jwt_validator = Arc::new(JwtValidator::new(
        key_loader.clone(),
        revocation.clone(),
        ProjectorRegistry::new(),
    ));

    let proxy_cache = Arc::new(ProxyCache::new(
        http.clone(),
        config.upstream.tokeninfo_url.clone(),
        config.upstream.cache_ttl,
        config.upstream.cache_max_size,
        metrics.clone(),
    ));

    // Background jobs: each fires immediately, then on its own interval,
    // with no overlap (spec §5).
    {
        let key_loader = key_loader.clone();
        scheduler::schedule("jwks-refresh", config.openid.refresh_interval, move || {
            let key_loader = key_loader.clone();
            async move { key_loader.refresh().await }
        });
    }
    {
        let revocation_puller = Arc::new(revocation_puller);
        scheduler::schedule(
            "revocation-refresh",
            config.revocation.provider_refresh_interval,
            move || {
                let revocation_puller = revocation_puller.clone();
                async move {
                    let now = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .map(|d| d.as_secs() as i64)
                        .unwrap_or(0);
                    revocation_puller.refresh(now).await
                }
            },
        );
    }

    let state = AppState {
        key_loader,
        revocation,
        jwt_validator,
        proxy_cache,
        metrics,
        uuid_tokens: config.upstream.uuid_tokens,
    };

    let app = tokeninfo_api::app(state.clone());
    let metrics_app = tokeninfo_api::metrics_app(state);

    let listener = tokio::net::TcpListener::bind(normalize_addr(&config.server.listen_address))
        .await
        .context("failed to bind main listener")?;
    let metrics_listener =
        tokio::net::TcpListener::bind(normalize_addr(&config.server.metrics_listen_address))
            .await
            .context("failed to bind metrics listener")?;

    info!(addr = %config.server.listen_address, "tokeninfo listener bound");
    info!(addr = %config.server.metrics_listen_address, "metrics listener bound");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        result = axum::serve(metrics_listener, metrics_app) => {
            result?;
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

/// Accepts both `":9021"` (bind-all-interfaces shorthand) and full
/// `"host:port"` addresses.
fn normalize_addr(addr: &str) -> String {
    if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        addr.to_string()
    }
}
