//! Delta-pull refresh driver for the revocation cache (spec §4.6 "Refresh
//! algorithm"). Runs under C2 on `revocation_provider_refresh_interval`.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::cache::RevocationCache;
use super::types::{validate_raw, RawRevocation};
use crate::http_client::HttpClient;
use tokeninfo_telemetry::Metrics;

#[derive(Debug, Deserialize)]
struct DeltaResponse {
    meta: DeltaMeta,
    revocations: Vec<RawRevocation>,
}

#[derive(Debug, Deserialize)]
struct DeltaMeta {
    #[serde(rename = "REFRESH_FROM")]
    refresh_from: i64,
    #[serde(rename = "REFRESH_TIMESTAMP")]
    refresh_timestamp: i64,
}

pub struct RevocationPuller {
    cache: Arc<RevocationCache>,
    http: Arc<HttpClient>,
    provider_url: String,
    refresh_tolerance_seconds: i64,
    ttl_seconds: i64,
    metrics: Arc<Metrics>,
}

impl RevocationPuller {
    pub fn new(
        cache: Arc<RevocationCache>,
        http: Arc<HttpClient>,
        provider_url: String,
        refresh_tolerance_seconds: i64,
        ttl_seconds: i64,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            cache,
            http,
            provider_url,
            refresh_tolerance_seconds,
            ttl_seconds,
            metrics,
        }
    }

    /// Step 1-6 of spec §4.6's refresh algorithm. Swallows and logs every
    /// failure: a bad poll must not crash the scheduler loop.
    pub async fn refresh(&self, now: i64) {
        let cursor = {
            let last = self.cache.last_ts();
            let base = if last == 0 { now - self.ttl_seconds } else { last };
            base - self.refresh_tolerance_seconds
        };

        let url = format!("{}?from={}", self.provider_url, cursor);
        let response = match self.http.get("refreshRevocations", &url).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "revocation feed poll failed");
                return;
            }
        };

        let body: DeltaResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "revocation feed body did not parse");
                return;
            }
        };

        if body.meta.refresh_timestamp != 0 {
            let current_marker = self.cache.force_refresh_marker().await.ok().flatten();
            if current_marker != Some(body.meta.refresh_timestamp) {
                match self
                    .cache
                    .force_refresh(body.meta.refresh_from, now, self.ttl_seconds)
                    .await
                {
                    Ok(true) => {
                        let marker = super::types::Revocation::ForceRefresh {
                            refresh_from: body.meta.refresh_from,
                            revoked_at: body.meta.refresh_timestamp,
                        };
                        if let Err(err) = self.cache.insert(marker).await {
                            warn!(error = %err, "failed to record FORCEREFRESH marker");
                        }
                    }
                    Ok(false) => {
                        warn!("FORCEREFRESH directive rejected by the TTL safety gate");
                    }
                    Err(err) => warn!(error = %err, "FORCEREFRESH sweep failed"),
                }
            }
        }

        for raw in &body.revocations {
            match validate_raw(raw, now) {
                Ok(revocation) => {
                    if let Err(err) = self.cache.insert(revocation).await {
                        warn!(error = %err, "failed to insert revocation");
                    }
                }
                Err(reason) => {
                    self.metrics.increment(&format!("revocation.invalid.{}", reason));
                    debug!(%reason, "dropped invalid revocation feed entry");
                }
            }
        }

        if let Err(err) = self.cache.expire_older_than(now - self.ttl_seconds).await {
            warn!(error = %err, "failed to expire stale revocations");
        }
    }
}
