//! Salted SHA-256 hashing for revocation identifiers.
//!
//! The revocation feed and this service must agree on one hash for a given
//! plaintext, so the salt is a process-shared secret rather than a random
//! per-call value. Spec §6 is explicit that the encoding is the *standard*
//! base64 alphabet, padded (not the URL-safe alphabet JWKS coordinates use) —
//! this must match the feed's own `token_hash`/`value_hash` encoding exactly,
//! or a TOKEN/CLAIM revocation can never hash-match a real token.
pub fn salted_sha256_base64(salt: &str, plaintext: &str) -> String {
    use base64::Engine;
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plaintext.as_bytes());
    let digest = hasher.finalize();
    base64::engine::general_purpose::STANDARD.encode(digest)
}

/// Joins claim values (or names) in order with `|`, the convention used for
/// both revocation-feed claim-name tuples and the hash input for CLAIM
/// revocations.
pub fn pipe_join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join("|")
}
