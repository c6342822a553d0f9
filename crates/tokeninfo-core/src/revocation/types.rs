//! The revocation sum type (spec §3 "Revocation") and its raw wire shape.

use serde::Deserialize;
use thiserror::Error;

/// A single active revocation. Kept as a sum type, not a shape-dependent
/// map, so validation and cache-key derivation are exhaustive matches.
#[derive(Debug, Clone, PartialEq)]
pub enum Revocation {
    Token {
        token_hash: String,
        revoked_at: i64,
        issued_before: i64,
    },
    Claim {
        value_hash: String,
        names: Vec<String>,
        issued_before: i64,
        revoked_at: i64,
    },
    Global {
        issued_before: i64,
        revoked_at: i64,
    },
    ForceRefresh {
        refresh_from: i64,
        revoked_at: i64,
    },
}

impl Revocation {
    /// Cache key per spec §3's invariant: TOKEN keys on `token_hash`, CLAIM
    /// on `value_hash`, GLOBAL and FORCEREFRESH are process-wide singletons.
    pub fn cache_key(&self) -> String {
        match self {
            Revocation::Token { token_hash, .. } => token_hash.clone(),
            Revocation::Claim { value_hash, .. } => value_hash.clone(),
            Revocation::Global { .. } => "GLOBAL".to_string(),
            Revocation::ForceRefresh { .. } => "FORCEREFRESH".to_string(),
        }
    }

    pub fn revoked_at(&self) -> i64 {
        match self {
            Revocation::Token { revoked_at, .. }
            | Revocation::Claim { revoked_at, .. }
            | Revocation::Global { revoked_at, .. }
            | Revocation::ForceRefresh { revoked_at, .. } => *revoked_at,
        }
    }

    /// The pipe-joined claim-name tuple for a CLAIM revocation, the key of
    /// the claim-name refcount map.
    pub fn claim_names_key(&self) -> Option<String> {
        match self {
            Revocation::Claim { names, .. } => Some(tokeninfo_crypto::pipe_join(names)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevocationValidationError {
    #[error("revocation missing identifying hash")]
    InvalidRevocation,
    #[error("issued_before is in the future")]
    IssuedInFuture,
    #[error("CLAIM revocation has no claim names")]
    MissingClaimName,
    #[error("unsupported revocation type: {0}")]
    UnsupportedType(String),
}

/// The raw entry shape from the revocation feed (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct RawRevocation {
    #[serde(rename = "type")]
    pub kind: String,
    pub revoked_at: i64,
    pub data: RawRevocationData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRevocationData {
    pub token_hash: Option<String>,
    pub value_hash: Option<String>,
    pub names: Option<Vec<String>>,
    pub issued_before: Option<i64>,
}

/// Validates and converts one raw feed entry, per spec §4.6 step 5.
pub fn validate_raw(raw: &RawRevocation, now: i64) -> Result<Revocation, RevocationValidationError> {
    match raw.kind.as_str() {
        "TOKEN" => {
            let token_hash = raw
                .data
                .token_hash
                .clone()
                .filter(|h| !h.is_empty())
                .ok_or(RevocationValidationError::InvalidRevocation)?;
            if raw.revoked_at <= 0 {
                return Err(RevocationValidationError::InvalidRevocation);
            }
            Ok(Revocation::Token {
                token_hash,
                revoked_at: raw.revoked_at,
                issued_before: raw.data.issued_before.unwrap_or(raw.revoked_at),
            })
        }
        "CLAIM" => {
            let value_hash = raw
                .data
                .value_hash
                .clone()
                .filter(|h| !h.is_empty())
                .ok_or(RevocationValidationError::InvalidRevocation)?;
            let names = raw
                .data
                .names
                .clone()
                .filter(|n| !n.is_empty())
                .ok_or(RevocationValidationError::MissingClaimName)?;
            if raw.revoked_at <= 0 {
                return Err(RevocationValidationError::InvalidRevocation);
            }
            Ok(Revocation::Claim {
                value_hash,
                names,
                issued_before: raw.data.issued_before.unwrap_or(raw.revoked_at),
                revoked_at: raw.revoked_at,
            })
        }
        "GLOBAL" => {
            let issued_before = raw
                .data
                .issued_before
                .ok_or(RevocationValidationError::InvalidRevocation)?;
            if issued_before > now {
                return Err(RevocationValidationError::IssuedInFuture);
            }
            if raw.revoked_at <= 0 {
                return Err(RevocationValidationError::InvalidRevocation);
            }
            Ok(Revocation::Global {
                issued_before,
                revoked_at: raw.revoked_at,
            })
        }
        other => Err(RevocationValidationError::UnsupportedType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_match_spec_invariant() {
        let token = Revocation::Token {
            token_hash: "h1".to_string(),
            revoked_at: 1,
            issued_before: 1,
        };
        assert_eq!(token.cache_key(), "h1");

        let global = Revocation::Global {
            issued_before: 1,
            revoked_at: 2,
        };
        assert_eq!(global.cache_key(), "GLOBAL");

        let force = Revocation::ForceRefresh {
            refresh_from: 1,
            revoked_at: 2,
        };
        assert_eq!(force.cache_key(), "FORCEREFRESH");
    }

    #[test]
    fn claim_names_key_is_pipe_joined() {
        let claim = Revocation::Claim {
            value_hash: "h".to_string(),
            names: vec!["realm".to_string(), "sub".to_string()],
            issued_before: 1,
            revoked_at: 1,
        };
        assert_eq!(claim.claim_names_key().unwrap(), "realm|sub");
    }

    #[test]
    fn rejects_global_issued_in_future() {
        let raw = RawRevocation {
            kind: "GLOBAL".to_string(),
            revoked_at: 100,
            data: RawRevocationData {
                token_hash: None,
                value_hash: None,
                names: None,
                issued_before: Some(1_000_000),
            },
        };
        assert_eq!(
            validate_raw(&raw, 100).unwrap_err(),
            RevocationValidationError::IssuedInFuture
        );
    }

    #[test]
    fn rejects_claim_without_names() {
        let raw = RawRevocation {
            kind: "CLAIM".to_string(),
            revoked_at: 100,
            data: RawRevocationData {
                token_hash: None,
                value_hash: Some("h".to_string()),
                names: None,
                issued_before: Some(50),
            },
        };
        assert_eq!(
            validate_raw(&raw, 200).unwrap_err(),
            RevocationValidationError::MissingClaimName
        );
    }

    #[test]
    fn rejects_unsupported_type() {
        let raw = RawRevocation {
            kind: "WEIRD".to_string(),
            revoked_at: 100,
            data: RawRevocationData {
                token_hash: None,
                value_hash: None,
                names: None,
                issued_before: None,
            },
        };
        assert!(matches!(
            validate_raw(&raw, 200),
            Err(RevocationValidationError::UnsupportedType(_))
        ));
    }
}
