//! `RevocationCache`: holds active revocations plus a derived claim-name
//! refcount map, and answers the "is this JWT revoked" question in the
//! GLOBAL -> TOKEN -> CLAIM order spec §4.6 requires for early exit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use secrecy::{ExposeSecret, Secret};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::types::Revocation;
use tokeninfo_cache::Cache;
use tokeninfo_crypto::{pipe_join, salted_sha256_base64};

/// Inputs the revocation check needs from a signature-verified JWT: the
/// raw compact serialization (for the TOKEN hash) and the string-valued
/// claim map (for CLAIM tuple hashing), plus the `iat` spec §4.6 step
/// requires be present for any check to proceed.
#[derive(Debug, Clone)]
pub struct RevocationCheckInput<'a> {
    pub raw_jwt: &'a str,
    pub claims: &'a HashMap<String, String>,
    pub issued_at: i64,
}

pub struct RevocationCache {
    entries: Cache<Revocation>,
    claim_name_refs: Arc<RwLock<HashMap<String, usize>>>,
    last_ts: AtomicI64,
    salt: Secret<String>,
}

impl RevocationCache {
    pub fn new(salt: Secret<String>) -> Self {
        Self {
            entries: Cache::new(),
            claim_name_refs: Arc::new(RwLock::new(HashMap::new())),
            last_ts: AtomicI64::new(0),
            salt,
        }
    }

    /// Monotonic cursor for the next delta-pull request (spec §4.6 step 1).
    /// Never regresses even if `insert`/`expire` race with a reader.
    pub fn last_ts(&self) -> i64 {
        self.last_ts.load(Ordering::SeqCst)
    }

    fn advance_last_ts(&self, candidate: i64) {
        let mut current = self.last_ts.load(Ordering::SeqCst);
        while candidate > current {
            match self.last_ts.compare_exchange_weak(
                current,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    /// The distinct claim-name tuples currently referenced by at least one
    /// active CLAIM revocation (spec §4.6's "claim hashing" contract: the
    /// caller hashes claim values only for combinations actually revoked).
    pub async fn claim_names(&self) -> Vec<Vec<String>> {
        self.claim_name_refs
            .read()
            .await
            .keys()
            .map(|joined| joined.split('|').map(str::to_string).collect())
            .collect()
    }

    /// Inserts or replaces one validated revocation, maintaining the
    /// claim-name refcount map atomically with the entry write.
    pub async fn insert(&self, revocation: Revocation) -> Result<(), tokeninfo_cache::CacheClosed> {
        self.advance_last_ts(revocation.revoked_at());
        let key = revocation.cache_key();
        let claim_key = revocation.claim_names_key();

        let previous = self.entries.set(key.clone(), revocation).await?;

        if let Some(claim_key) = claim_key {
            if !matches!(previous, Some(Revocation::Claim { .. })) {
                let mut refs = self.claim_name_refs.write().await;
                *refs.entry(claim_key).or_insert(0) += 1;
            }
        }
        Ok(())
    }

    /// Removes an expired revocation, decrementing the claim-name refcount
    /// and dropping the tuple once its last reference is gone.
    pub async fn expire_key(&self, key: &str) -> Result<(), tokeninfo_cache::CacheClosed> {
        let removed = self.entries.delete(key).await?;
        if let Some(claim_key) = removed.as_ref().and_then(Revocation::claim_names_key) {
            let mut refs = self.claim_name_refs.write().await;
            if let Some(count) = refs.get_mut(&claim_key) {
                *count -= 1;
                if *count == 0 {
                    refs.remove(&claim_key);
                }
            }
        }
        Ok(())
    }

    /// Drops every entry (other than FORCEREFRESH markers) whose TTL has
    /// elapsed (spec §4.6's `expire()` contract, called at the end of every
    /// refresh).
    pub async fn expire_older_than(&self, ttl_cutoff: i64) -> Result<(), tokeninfo_cache::CacheClosed> {
        let snapshot = self.entries.snapshot().await?;
        for (key, revocation) in snapshot {
            let expired = match &revocation {
                Revocation::ForceRefresh { .. } => false,
                other => other.revoked_at() < ttl_cutoff,
            };
            if expired {
                self.expire_key(&key).await?;
            }
        }
        Ok(())
    }

    /// The `revoked_at` of the currently stored FORCEREFRESH marker, if
    /// any. Used to detect whether a feed's directive has already been
    /// applied (spec §4.6 step 4's idempotence requirement).
    pub async fn force_refresh_marker(&self) -> Result<Option<i64>, tokeninfo_cache::CacheClosed> {
        Ok(self.entries.get("FORCEREFRESH").await?.map(|r| r.revoked_at()))
    }

    /// FORCEREFRESH is safety-gated: a malicious or buggy feed cannot reset
    /// the cursor into the distant past; `ts` must be no older than
    /// `now - ttl` (spec §4.6's `force_refresh` contract).
    pub async fn force_refresh(&self, ts: i64, now: i64, ttl_seconds: i64) -> Result<bool, tokeninfo_cache::CacheClosed> {
        if ts < now - ttl_seconds {
            warn!(ts, now, ttl_seconds, "ignoring FORCEREFRESH older than the TTL window");
            return Ok(false);
        }

        let snapshot = self.entries.snapshot().await?;
        for (key, revocation) in snapshot {
            let drop = !matches!(revocation, Revocation::ForceRefresh { .. }) && revocation.revoked_at() >= ts;
            if drop {
                self.expire_key(&key).await?;
            }
        }
        debug!(ts, "applied FORCEREFRESH sweep");
        Ok(true)
    }

    /// GLOBAL -> TOKEN -> CLAIM, returning on the first match so a GLOBAL
    /// wipe doesn't pay for more cache lookups than necessary.
    pub async fn is_jwt_revoked(
        &self,
        input: &RevocationCheckInput<'_>,
    ) -> Result<bool, tokeninfo_cache::CacheClosed> {
        if let Some(Revocation::Global { issued_before, .. }) =
            self.entries.get("GLOBAL").await?
        {
            if issued_before > input.issued_at {
                return Ok(true);
            }
        }

        let salt = self.salt.expose_secret();
        let token_hash = salted_sha256_base64(salt, input.raw_jwt);
        if let Some(Revocation::Token { issued_before, .. }) = self.entries.get(&token_hash).await? {
            if issued_before > input.issued_at {
                return Ok(true);
            }
        }

        for tuple in self.claim_names().await {
            let mut values = Vec::with_capacity(tuple.len());
            let mut complete = true;
            for name in &tuple {
                match input.claims.get(name) {
                    Some(value) => values.push(value.as_str()),
                    None => {
                        complete = false;
                        break;
                    }
                }
            }
            if !complete {
                continue;
            }
            let joined = pipe_join(&values);
            let hash = salted_sha256_base64(salt, &joined);
            if let Some(Revocation::Claim { issued_before, .. }) = self.entries.get(&hash).await? {
                if issued_before > input.issued_at {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> RevocationCache {
        RevocationCache::new(Secret::new("pepper".to_string()))
    }

    #[tokio::test]
    async fn global_revocation_wins_over_unrevoked_token() {
        let cache = cache();
        cache
            .insert(Revocation::Global {
                issued_before: 1_000,
                revoked_at: 2_000,
            })
            .await
            .unwrap();

        let claims = HashMap::new();
        let input = RevocationCheckInput {
            raw_jwt: "abc.def.ghi",
            claims: &claims,
            issued_at: 500,
        };
        assert!(cache.is_jwt_revoked(&input).await.unwrap());
    }

    #[tokio::test]
    async fn token_hash_matches_salted_sha256_of_raw_jwt() {
        let cache = cache();
        let raw = "abc.def.ghi";
        let hash = salted_sha256_base64("pepper", raw);
        cache
            .insert(Revocation::Token {
                token_hash: hash,
                revoked_at: 2_000,
                issued_before: 1_000,
            })
            .await
            .unwrap();

        let claims = HashMap::new();
        let input = RevocationCheckInput {
            raw_jwt: raw,
            claims: &claims,
            issued_at: 500,
        };
        assert!(cache.is_jwt_revoked(&input).await.unwrap());
    }

    #[tokio::test]
    async fn token_issued_after_revocation_is_not_revoked() {
        let cache = cache();
        let raw = "abc.def.ghi";
        let hash = salted_sha256_base64("pepper", raw);
        cache
            .insert(Revocation::Token {
                token_hash: hash,
                revoked_at: 2_000,
                issued_before: 1_000,
            })
            .await
            .unwrap();

        let claims = HashMap::new();
        let input = RevocationCheckInput {
            raw_jwt: raw,
            claims: &claims,
            issued_at: 1_500,
        };
        assert!(!cache.is_jwt_revoked(&input).await.unwrap());
    }

    #[tokio::test]
    async fn claim_tuple_revocation_matches_pipe_joined_values() {
        let cache = cache();
        let value_hash = salted_sha256_base64("pepper", &pipe_join(["/test"]));
        cache
            .insert(Revocation::Claim {
                value_hash,
                names: vec!["realm".to_string()],
                issued_before: 1_000,
                revoked_at: 2_000,
            })
            .await
            .unwrap();

        let mut claims = HashMap::new();
        claims.insert("realm".to_string(), "/test".to_string());
        let input = RevocationCheckInput {
            raw_jwt: "abc.def.ghi",
            claims: &claims,
            issued_at: 500,
        };
        assert!(cache.is_jwt_revoked(&input).await.unwrap());
    }

    #[tokio::test]
    async fn claim_tuple_skipped_when_a_claim_is_missing() {
        let cache = cache();
        let value_hash = salted_sha256_base64("pepper", &pipe_join(["/test", "foo"]));
        cache
            .insert(Revocation::Claim {
                value_hash,
                names: vec!["realm".to_string(), "sub".to_string()],
                issued_before: 1_000,
                revoked_at: 2_000,
            })
            .await
            .unwrap();

        let mut claims = HashMap::new();
        claims.insert("realm".to_string(), "/test".to_string());
        let input = RevocationCheckInput {
            raw_jwt: "abc.def.ghi",
            claims: &claims,
            issued_at: 500,
        };
        assert!(!cache.is_jwt_revoked(&input).await.unwrap());
    }

    #[tokio::test]
    async fn claim_name_refcount_drops_to_zero_after_expiry() {
        let cache = cache();
        let revocation = Revocation::Claim {
            value_hash: "h".to_string(),
            names: vec!["sub".to_string()],
            issued_before: 1_000,
            revoked_at: 2_000,
        };
        cache.insert(revocation).await.unwrap();
        assert_eq!(cache.claim_names().await.len(), 1);

        cache.expire_key("h").await.unwrap();
        assert!(cache.claim_names().await.is_empty());
    }

    #[tokio::test]
    async fn last_ts_never_regresses() {
        let cache = cache();
        cache
            .insert(Revocation::Token {
                token_hash: "a".to_string(),
                revoked_at: 5_000,
                issued_before: 1,
            })
            .await
            .unwrap();
        assert_eq!(cache.last_ts(), 5_000);

        cache
            .insert(Revocation::Token {
                token_hash: "b".to_string(),
                revoked_at: 1_000,
                issued_before: 1,
            })
            .await
            .unwrap();
        assert_eq!(cache.last_ts(), 5_000);
    }

    #[tokio::test]
    async fn force_refresh_rejects_ts_older_than_ttl_window() {
        let cache = cache();
        assert!(!cache.force_refresh(100, 10_000, 60).await.unwrap());
    }

    #[tokio::test]
    async fn force_refresh_drops_entries_at_or_after_ts_but_spares_force_refresh_markers() {
        let cache = cache();
        cache
            .insert(Revocation::Token {
                token_hash: "a".to_string(),
                revoked_at: 5_000,
                issued_before: 1,
            })
            .await
            .unwrap();
        cache
            .insert(Revocation::ForceRefresh {
                refresh_from: 1,
                revoked_at: 4_000,
            })
            .await
            .unwrap();

        assert!(cache.force_refresh(5_000, 10_000, 60_000).await.unwrap());
        assert!(cache.entries.get("a").await.unwrap().is_none());
        assert!(cache
            .entries
            .get("FORCEREFRESH")
            .await
            .unwrap()
            .is_some());
    }
}
