//! Internal error taxonomy. The wire only ever shows the two standard
//! OAuth errors (`invalid_request` / `invalid_token`) or a proxy status
//! code; this enum exists so logs can carry the specific reason, matching
//! the teacher's `AuthError`/`tokeninfo-api::error::ApiError` split.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("bearer token missing or malformed")]
    ParseFailure,
    #[error("no key found for kid")]
    UnknownKid,
    #[error("algorithm not permitted")]
    UnsupportedAlg,
    #[error("signature verification failed")]
    BadSignature,
    #[error("required claim missing or ill-typed: {0}")]
    BadClaim(ClaimKind),
    #[error("token expired")]
    Expired,
    #[error("token revoked")]
    Revoked,
    #[error("upstream call timed out")]
    UpstreamTimeout,
    #[error("upstream circuit breaker rejected the call (overloaded)")]
    UpstreamOverloaded,
    #[error("upstream circuit breaker is open")]
    UpstreamOpen,
    #[error("upstream call failed")]
    UpstreamOther,
}

/// Which required claim failed to project, kept distinct in logs the way
/// `original_source/handlers/tokeninfo/jwt/tokeninfo.go` names
/// `ErrInvalidClaimScope`/`ErrInvalidClaimSub`/`ErrInvalidClaimRealm`/`ErrInvalidClaimExp`
/// as separate constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimKind {
    Scope,
    Sub,
    Realm,
    Exp,
}

impl std::fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClaimKind::Scope => "scope",
            ClaimKind::Sub => "sub",
            ClaimKind::Realm => "realm",
            ClaimKind::Exp => "exp",
        };
        f.write_str(name)
    }
}

/// The wire-visible OAuth error family (spec §3 "Error").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthError {
    InvalidRequest,
    InvalidToken,
}

impl OAuthError {
    pub fn code(self) -> &'static str {
        match self {
            OAuthError::InvalidRequest => "invalid_request",
            OAuthError::InvalidToken => "invalid_token",
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            OAuthError::InvalidRequest => 400,
            OAuthError::InvalidToken => 401,
        }
    }
}

impl ErrorKind {
    /// Maps the internal reason to the two-valued wire taxonomy.
    pub fn to_oauth_error(&self) -> OAuthError {
        match self {
            ErrorKind::ParseFailure => OAuthError::InvalidRequest,
            _ => OAuthError::InvalidToken,
        }
    }
}

/// Proxy-path failures classified per §4.3, mapped to HTTP status by the
/// API layer (504/429/502/500).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorClass {
    Timeout,
    Overloaded,
    Open,
    Other,
}

impl UpstreamErrorClass {
    pub fn http_status(self) -> u16 {
        match self {
            UpstreamErrorClass::Timeout => 504,
            UpstreamErrorClass::Overloaded => 429,
            UpstreamErrorClass::Open => 502,
            UpstreamErrorClass::Other => 500,
        }
    }
}
