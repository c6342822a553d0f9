//! JWKS key loader (spec §4.4): periodic OIDC discovery + JWKS fetch,
//! decoding into a `kid -> DecodedKey` map held in a C1 cache.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::http_client::HttpClient;
use tokeninfo_cache::Cache;
use tokeninfo_crypto::{decode_key, DecodedKey, RawJsonWebKey};
use tokeninfo_telemetry::Metrics;

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<RawJsonWebKey>,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyLoaderError {
    #[error("no key found for kid {0}")]
    UnknownKid(String),
    #[error("cache owner task is no longer running")]
    CacheClosed,
}

impl From<tokeninfo_cache::CacheClosed> for KeyLoaderError {
    fn from(_: tokeninfo_cache::CacheClosed) -> Self {
        KeyLoaderError::CacheClosed
    }
}

/// A decoded key plus the raw JWKS entry it came from, so
/// `/oauth2/connect/keys` can re-encode exactly what was published rather
/// than reconstructing it from the opaque `jsonwebtoken::DecodingKey`.
pub struct CachedKey {
    pub raw: RawJsonWebKey,
    pub decoded: DecodedKey,
}

/// Holds the current id->key map and knows how to refresh it from the
/// configured OIDC provider. One instance per process.
pub struct KeyLoader {
    keys: Cache<Arc<CachedKey>>,
    http: Arc<HttpClient>,
    discovery_url: String,
    metrics: Arc<Metrics>,
}

impl KeyLoader {
    pub fn new(http: Arc<HttpClient>, discovery_url: String, metrics: Arc<Metrics>) -> Self {
        Self {
            keys: Cache::new(),
            http,
            discovery_url,
            metrics,
        }
    }

    pub async fn load_key(&self, id: &str) -> Result<Arc<CachedKey>, KeyLoaderError> {
        self.keys
            .get(id)
            .await?
            .ok_or_else(|| KeyLoaderError::UnknownKid(id.to_string()))
    }

    pub async fn keys(&self) -> Result<HashMap<String, Arc<CachedKey>>, KeyLoaderError> {
        Ok(self.keys.snapshot().await?)
    }

    /// Installs a key set directly, bypassing discovery/JWKS fetch. Used to
    /// preload keys ahead of the first scheduled refresh, and by tests that
    /// need a known `kid` in place without standing up an OIDC provider.
    pub async fn install(&self, keys: HashMap<String, Arc<CachedKey>>) -> Result<(), KeyLoaderError> {
        self.keys.reset(keys).await?;
        Ok(())
    }

    /// Spec §4.4's refresh algorithm, steps 1-6. Every failure keeps the
    /// current cache and returns quietly; only a nonempty new map ever
    /// replaces what is already live.
    pub async fn refresh(&self) {
        let discovery = match self.http.get("loadConfiguration", &self.discovery_url).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "OIDC discovery fetch failed");
                return;
            }
        };

        let discovery: DiscoveryDocument = match discovery.json().await {
            Ok(doc) => doc,
            Err(err) => {
                warn!(error = %err, "OIDC discovery document did not parse");
                return;
            }
        };

        let Some(jwks_uri) = discovery.jwks_uri else {
            warn!("OIDC discovery document had no jwks_uri");
            return;
        };

        let jwks_response = match self.http.get("loadKeys", &jwks_uri).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "JWKS fetch failed");
                return;
            }
        };

        let jwks: JwksDocument = match jwks_response.json().await {
            Ok(doc) => doc,
            Err(err) => {
                warn!(error = %err, "JWKS document did not parse");
                return;
            }
        };

        let mut new_keys: HashMap<String, Arc<CachedKey>> = HashMap::new();
        for raw in &jwks.keys {
            match decode_key(raw) {
                Ok(decoded) => {
                    if new_keys.contains_key(&decoded.kid) {
                        warn!(kid = %decoded.kid, "duplicate kid in JWKS response, keeping first");
                        continue;
                    }
                    new_keys.insert(
                        decoded.kid.clone(),
                        Arc::new(CachedKey {
                            raw: raw.clone(),
                            decoded,
                        }),
                    );
                }
                Err(err) => debug!(error = %err, "skipping undecodable JWKS entry"),
            }
        }

        if new_keys.is_empty() {
            warn!("JWKS refresh produced zero usable keys, keeping current cache");
            self.metrics.increment("jwks.no_keys");
            return;
        }

        match self.keys.snapshot().await {
            Ok(previous) => self.log_transitions(&previous, &new_keys),
            Err(_) => return,
        }

        if self.keys.reset(new_keys.clone()).await.is_ok() {
            self.metrics.increment("jwks.refresh_ok");
            info!(key_count = new_keys.len(), "JWKS cache refreshed");
        }
    }

    fn log_transitions(
        &self,
        previous: &HashMap<String, Arc<CachedKey>>,
        next: &HashMap<String, Arc<CachedKey>>,
    ) {
        for kid in next.keys() {
            if !previous.contains_key(kid) {
                info!(kid, "new key added to JWKS cache");
            }
        }
        for kid in previous.keys() {
            if !next.contains_key(kid) {
                info!(kid, "key removed from JWKS cache");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitBreakerRegistry;
    use std::time::Duration;

    fn http_client() -> Arc<HttpClient> {
        let breakers = Arc::new(CircuitBreakerRegistry::new(5, Duration::from_secs(30), Arc::new(Metrics::new())));
        Arc::new(
            HttpClient::new(
                Duration::from_secs(1),
                Duration::from_secs(1),
                breakers,
                Arc::new(Metrics::new()),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn unknown_kid_is_an_error() {
        let loader = KeyLoader::new(http_client(), "http://example.invalid/discovery".to_string(), Arc::new(Metrics::new()));
        let err = loader.load_key("missing").await.unwrap_err();
        assert!(matches!(err, KeyLoaderError::UnknownKid(_)));
    }

    #[tokio::test]
    async fn refresh_against_unreachable_host_keeps_cache_empty_without_panicking() {
        let loader = KeyLoader::new(http_client(), "http://127.0.0.1:1/discovery".to_string(), Arc::new(Metrics::new()));
        loader.refresh().await;
        assert!(loader.keys().await.unwrap().is_empty());
    }
}
