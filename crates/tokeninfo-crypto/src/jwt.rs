//! Low-level JWT mechanics: algorithm whitelisting, header/claims parsing,
//! and signature verification against an already-resolved key.
//!
//! This module deliberately knows nothing about `kid` lookup, revocation,
//! or TokenInfo projection — those live in `tokeninfo-core`'s JWT validator,
//! which calls through here once it has resolved a key for the token's
//! `kid`. Keeping verification mechanics separate from claim policy mirrors
//! the split in the reference implementation between its JWT parsing layer
//! and its tokeninfo claim-projection layer.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("missing or non-string key id")]
    MissingKeyId,
    #[error("algorithm {0:?} is not permitted; only RS*/ES* are accepted")]
    AlgorithmNotPermitted(Algorithm),
    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),
    #[error("token expired")]
    Expired,
}

/// RS256/384/512 and ES256/384 — the HMAC family is never in this list, so
/// a token signed `HS256` with, say, a public key used as an HMAC secret
/// (the classic algorithm-substitution attack) cannot verify.
pub const PERMITTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::ES384,
];

/// Reads the header without verifying the signature, to learn `alg` and
/// `kid` before a key has been resolved.
pub fn peek_header(token: &str) -> Result<Header, JwtError> {
    decode_header(token).map_err(|err| JwtError::Malformed(err.to_string()))
}

/// Returns the header's `kid`, requiring it be present and a string.
pub fn require_key_id(header: &Header) -> Result<String, JwtError> {
    header.kid.clone().ok_or(JwtError::MissingKeyId)
}

/// Rejects any algorithm outside [`PERMITTED_ALGORITHMS`].
pub fn require_permitted_algorithm(header: &Header) -> Result<(), JwtError> {
    if PERMITTED_ALGORITHMS.contains(&header.alg) {
        Ok(())
    } else {
        Err(JwtError::AlgorithmNotPermitted(header.alg))
    }
}

/// Verifies the signature and standard `exp` validity under the given
/// algorithm and key, returning the claims as a raw JSON object for the
/// caller to project.
pub fn verify(token: &str, algorithm: Algorithm, key: &DecodingKey) -> Result<Value, JwtError> {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    // Issuer/audience are policy decisions made per-`iss` by the claim
    // projector, not generic JWT mechanics, so they are left unchecked here.
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Value>(token, key, &validation).map_err(|err| {
        use jsonwebtoken::errors::ErrorKind::*;
        match err.kind() {
            ExpiredSignature => JwtError::Expired,
            InvalidSignature | InvalidRsaKey(_) | InvalidEcdsaKey => {
                JwtError::SignatureInvalid(err.to_string())
            }
            _ => JwtError::Malformed(err.to_string()),
        }
    })?;

    Ok(data.claims)
}
