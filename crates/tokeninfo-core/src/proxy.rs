//! Upstream proxy handler (spec §4.7): caches opaque-token tokeninfo
//! responses by bearer, fetching on miss through the named `"proxy"`
//! circuit breaker. The director's Host/Path rewrite is just the configured
//! `upstream_url`; everything else about the original request — query
//! string, `Authorization` header — is forwarded through to the upstream
//! call unchanged. The outer HTTP request/response plumbing is an axum
//! concern and lives in `tokeninfo-api`; this module owns the cache and the
//! fetch-and-classify decision the handler consumes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::UpstreamErrorClass;
use crate::http_client::{HttpCallError, HttpClient};
use tokeninfo_cache::Cache;
use tokeninfo_telemetry::Metrics;

const UUID_SEGMENT_LENGTHS: [usize; 5] = [8, 4, 4, 4, 12];

/// True when `bearer` has the 8-4-4-4-12 hex-UUID shape spec §4.7's
/// `upstream_has_uuid_tokens` match predicate calls for.
pub fn looks_like_uuid(bearer: &str) -> bool {
    let segments: Vec<&str> = bearer.split('-').collect();
    if segments.len() != UUID_SEGMENT_LENGTHS.len() {
        return false;
    }
    segments
        .iter()
        .zip(UUID_SEGMENT_LENGTHS.iter())
        .all(|(segment, &expected_len)| segment.len() == expected_len && segment.chars().all(|c| c.is_ascii_hexdigit()))
}

#[derive(Clone)]
struct CachedResponse {
    body: String,
    cached_at: Instant,
}

pub enum ProxyOutcome {
    CacheHit { body: String },
    Fetched { status: u16, body: String, cacheable: bool },
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("upstream call failed")]
    Upstream(UpstreamErrorClass),
}

pub struct ProxyCache {
    entries: Cache<CachedResponse>,
    http: Arc<HttpClient>,
    upstream_url: String,
    ttl: Duration,
    max_size: usize,
    metrics: Arc<Metrics>,
}

impl ProxyCache {
    pub fn new(http: Arc<HttpClient>, upstream_url: String, ttl: Duration, max_size: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            entries: Cache::new(),
            http,
            upstream_url,
            ttl,
            max_size,
            metrics,
        }
    }

    /// Steps 2-4 of spec §4.7's serve algorithm. The director's Host/Path
    /// rewrite already happened by the time `upstream_url` was configured;
    /// everything else about the original request — its query string and its
    /// `Authorization` header — is forwarded unchanged, the way the reference
    /// director forwards the whole request and only rewrites Host/Path.
    pub async fn fetch(
        &self,
        bearer: &str,
        query: Option<&str>,
        authorization: Option<&str>,
    ) -> Result<ProxyOutcome, ProxyError> {
        if let Some(cached) = self.entries.get(bearer).await.ok().flatten() {
            if cached.cached_at.elapsed() < self.ttl {
                self.metrics.increment("proxy.cache.hit");
                return Ok(ProxyOutcome::CacheHit { body: cached.body });
            }
        }
        self.metrics.increment("proxy.cache.miss");

        let url = match query {
            Some(query) if !query.is_empty() => format!("{}?{}", self.upstream_url, query),
            _ => self.upstream_url.clone(),
        };
        let response = self
            .http
            .get_passthrough("proxy", &url, authorization)
            .await
            .map_err(|err: HttpCallError| ProxyError::Upstream(err.classify()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|_| ProxyError::Upstream(UpstreamErrorClass::Other))?;

        let cacheable = status == 200 && self.ttl > Duration::ZERO && self.has_room(bearer).await;
        if cacheable {
            let _ = self
                .entries
                .set(
                    bearer.to_string(),
                    CachedResponse {
                        body: body.clone(),
                        cached_at: Instant::now(),
                    },
                )
                .await;
        } else {
            debug!(status, "non-cacheable proxy response");
        }

        Ok(ProxyOutcome::Fetched { status, body, cacheable })
    }

    /// Spec §4.7's response cache has a fixed max size (`UPSTREAM_CACHE_MAX_SIZE`):
    /// once full, new tokens are served but not cached until existing entries
    /// expire and are evicted by TTL. A size of zero disables caching entirely.
    async fn has_room(&self, bearer: &str) -> bool {
        if self.max_size == 0 {
            return false;
        }
        match self.entries.snapshot().await {
            Ok(snapshot) => snapshot.len() < self.max_size || snapshot.contains_key(bearer),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitBreakerRegistry;
    use std::time::Duration as StdDuration;

    fn cache_with_max_size(max_size: usize) -> ProxyCache {
        let metrics = Arc::new(Metrics::new());
        let breakers = Arc::new(CircuitBreakerRegistry::new(5, StdDuration::from_secs(30), metrics.clone()));
        let http = Arc::new(
            HttpClient::new(StdDuration::from_secs(1), StdDuration::from_secs(1), breakers, metrics.clone()).unwrap(),
        );
        ProxyCache::new(http, "http://example.invalid".to_string(), StdDuration::from_secs(60), max_size, metrics)
    }

    #[tokio::test]
    async fn zero_max_size_disables_caching() {
        let cache = cache_with_max_size(0);
        assert!(!cache.has_room("tok").await);
    }

    #[tokio::test]
    async fn has_room_until_the_cache_is_full() {
        let cache = cache_with_max_size(1);
        assert!(cache.has_room("tok-a").await);
        cache
            .entries
            .set("tok-a".to_string(), CachedResponse { body: "{}".to_string(), cached_at: Instant::now() })
            .await
            .unwrap();
        assert!(!cache.has_room("tok-b").await);
        assert!(cache.has_room("tok-a").await, "an existing key never counts against its own slot");
    }

    #[test]
    fn accepts_well_formed_uuid() {
        assert!(looks_like_uuid("12345678-1234-1234-1234-123456789abc"));
    }

    #[test]
    fn rejects_wrong_segment_lengths() {
        assert!(!looks_like_uuid("1234-1234-1234-1234-123456789abc"));
    }

    #[test]
    fn rejects_non_hex_characters() {
        assert!(!looks_like_uuid("zzzzzzzz-1234-1234-1234-123456789abc"));
    }

    #[test]
    fn rejects_a_raw_jwt() {
        assert!(!looks_like_uuid("eyJhbGciOiJSUzI1NiJ9.eyJzdWIiOiJmb28ifQ.sig"));
    }
}
