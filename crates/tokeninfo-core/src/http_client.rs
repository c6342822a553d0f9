//! Outbound HTTP GET wrapped by the named circuit breaker registry (spec
//! §4.3). Grounded on the teacher's `reqwest::Client` usage in
//! `services::otp_delivery`, generalized to a single shared client with
//! keep-alives disabled (each outbound dependency — upstream tokeninfo,
//! JWKS, revocation feed — is polled infrequently enough that connection
//! reuse buys nothing and a half-dead pooled connection would otherwise
//! surface as a spurious timeout).

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::warn;

use crate::error::UpstreamErrorClass;
use crate::resilience::circuit_breaker::BreakerDecision;
use crate::resilience::CircuitBreakerRegistry;
use tokeninfo_telemetry::Metrics;

pub const USER_AGENT: &str = concat!("tokeninfo-service/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum HttpCallError {
    #[error("circuit breaker for {0} is open")]
    BreakerOpen(String),
    #[error("circuit breaker for {0} is already probing")]
    Overloaded(String),
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Other(String),
}

impl HttpCallError {
    pub fn classify(&self) -> UpstreamErrorClass {
        match self {
            HttpCallError::BreakerOpen(_) => UpstreamErrorClass::Open,
            HttpCallError::Overloaded(_) => UpstreamErrorClass::Overloaded,
            HttpCallError::Timeout => UpstreamErrorClass::Timeout,
            HttpCallError::Other(_) => UpstreamErrorClass::Other,
        }
    }
}

pub struct HttpClient {
    client: Client,
    breakers: Arc<CircuitBreakerRegistry>,
    metrics: Arc<Metrics>,
}

impl HttpClient {
    pub fn new(
        connect_timeout: Duration,
        overall_timeout: Duration,
        breakers: Arc<CircuitBreakerRegistry>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .connect_timeout(connect_timeout)
            .timeout(overall_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            breakers,
            metrics,
        })
    }

    /// Issues a GET against `url`, gated by the breaker named `call_name`.
    /// On success or failure the breaker and the `call_name` metrics series
    /// are both updated before the result is returned.
    pub async fn get(&self, call_name: &str, url: &str) -> Result<reqwest::Response, HttpCallError> {
        match self.breakers.allow(call_name).await {
            BreakerDecision::Allow => {}
            BreakerDecision::Open => return Err(HttpCallError::BreakerOpen(call_name.to_string())),
            BreakerDecision::Overloaded => return Err(HttpCallError::Overloaded(call_name.to_string())),
        }

        let started = Instant::now();
        let result = self.client.get(url).send().await;
        let latency = started.elapsed();

        match result {
            Ok(response) if response.status().is_success() => {
                self.breakers.record_success(call_name).await;
                self.metrics.record_call(call_name, true, latency);
                Ok(response)
            }
            Ok(response) => {
                self.breakers.record_failure(call_name).await;
                self.metrics.record_call(call_name, false, latency);
                warn!(call_name, status = %response.status(), "upstream call returned non-success status");
                Err(HttpCallError::Other(format!("status {}", response.status())))
            }
            Err(err) => {
                self.breakers.record_failure(call_name).await;
                self.metrics.record_call(call_name, false, latency);
                if err.is_timeout() {
                    Err(HttpCallError::Timeout)
                } else {
                    Err(HttpCallError::Other(err.to_string()))
                }
            }
        }
    }

    /// Like `get`, but never maps a non-2xx HTTP status onto `HttpCallError`
    /// — the proxy path (spec §4.7) passes the upstream status straight
    /// through to the client, so only connectivity/timeout failures and an
    /// open breaker count as call failures here. `authorization`, when
    /// present, is forwarded verbatim as the outbound request's
    /// `Authorization` header, matching the director's pass-everything-through
    /// behavior for the original caller's credentials.
    pub async fn get_passthrough(
        &self,
        call_name: &str,
        url: &str,
        authorization: Option<&str>,
    ) -> Result<reqwest::Response, HttpCallError> {
        match self.breakers.allow(call_name).await {
            BreakerDecision::Allow => {}
            BreakerDecision::Open => return Err(HttpCallError::BreakerOpen(call_name.to_string())),
            BreakerDecision::Overloaded => return Err(HttpCallError::Overloaded(call_name.to_string())),
        }

        let started = Instant::now();
        let mut request = self.client.get(url);
        if let Some(authorization) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }
        let result = request.send().await;
        let latency = started.elapsed();

        match result {
            Ok(response) => {
                self.breakers.record_success(call_name).await;
                self.metrics.record_call(call_name, true, latency);
                Ok(response)
            }
            Err(err) => {
                self.breakers.record_failure(call_name).await;
                self.metrics.record_call(call_name, false, latency);
                if err.is_timeout() {
                    Err(HttpCallError::Timeout)
                } else {
                    Err(HttpCallError::Other(err.to_string()))
                }
            }
        }
    }
}
