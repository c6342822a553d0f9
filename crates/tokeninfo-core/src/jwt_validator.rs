//! JWT validator (spec §4.5): wires JWT mechanics (`tokeninfo-crypto`), the
//! JWKS key loader (C4), the revocation cache (C6), and claims projection
//! into a single `validate()` entry point.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{ClaimKind, ErrorKind};
use crate::jwks::{KeyLoader, KeyLoaderError};
use crate::model::TokenInfo;
use crate::revocation::{RevocationCache, RevocationCheckInput};
use tokeninfo_crypto::jwt::{peek_header, require_key_id, require_permitted_algorithm, verify};

/// A per-issuer override of the default claims projection (spec §4.5
/// "Pluggable per-issuer projection"). Registered once at startup; the
/// table itself is process-initialization state, read-mostly thereafter.
pub trait ClaimProjector: Send + Sync {
    fn project(&self, raw_jwt: &str, claims: &Value, expires_in: i64) -> Result<TokenInfo, ErrorKind>;
}

#[derive(Default)]
pub struct ProjectorRegistry {
    by_issuer: HashMap<String, Arc<dyn ClaimProjector>>,
}

impl ProjectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, issuer: impl Into<String>, projector: Arc<dyn ClaimProjector>) {
        self.by_issuer.insert(issuer.into(), projector);
    }

    fn resolve(&self, issuer: Option<&str>) -> Option<Arc<dyn ClaimProjector>> {
        issuer.and_then(|iss| self.by_issuer.get(iss).cloned())
    }
}

/// The fallback projection spec §4.5 step 6 describes: requires `scope`
/// (array of strings), `sub`, `realm`, `exp`; `azp` is optional -> `client_id`.
struct DefaultProjector;

impl ClaimProjector for DefaultProjector {
    fn project(&self, raw_jwt: &str, claims: &Value, expires_in: i64) -> Result<TokenInfo, ErrorKind> {
        let scope = claims
            .get("scope")
            .and_then(Value::as_array)
            .ok_or(ErrorKind::BadClaim(ClaimKind::Scope))?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Option<Vec<String>>>()
            .ok_or(ErrorKind::BadClaim(ClaimKind::Scope))?;

        let sub = claims
            .get("sub")
            .and_then(Value::as_str)
            .ok_or(ErrorKind::BadClaim(ClaimKind::Sub))?
            .to_string();

        let realm = claims
            .get("realm")
            .and_then(Value::as_str)
            .ok_or(ErrorKind::BadClaim(ClaimKind::Realm))?
            .to_string();

        if claims.get("exp").and_then(Value::as_i64).is_none() {
            return Err(ErrorKind::BadClaim(ClaimKind::Exp));
        }

        let client_id = claims.get("azp").and_then(Value::as_str).map(str::to_string);

        let mut private_claims = serde_json::Map::new();
        if let Value::Object(map) = claims {
            for (key, value) in map {
                if !matches!(key.as_str(), "scope" | "sub" | "realm" | "exp" | "azp" | "iss" | "iat") {
                    private_claims.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(TokenInfo {
            access_token: raw_jwt.to_string(),
            uid: sub,
            scope,
            realm,
            client_id,
            expires_in,
            refresh_token: None,
            private_claims,
        })
    }
}

pub struct JwtValidator {
    key_loader: Arc<KeyLoader>,
    revocation: Arc<RevocationCache>,
    projectors: ProjectorRegistry,
    default_projector: DefaultProjector,
}

impl JwtValidator {
    pub fn new(key_loader: Arc<KeyLoader>, revocation: Arc<RevocationCache>, projectors: ProjectorRegistry) -> Self {
        Self {
            key_loader,
            revocation,
            projectors,
            default_projector: DefaultProjector,
        }
    }

    /// The router's match predicate (spec §4.5): exactly three
    /// dot-separated, non-empty segments.
    pub fn looks_like_jwt(bearer: &str) -> bool {
        let segments: Vec<&str> = bearer.split('.').collect();
        segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
    }

    pub async fn validate(&self, raw_jwt: &str, now: i64) -> Result<TokenInfo, ErrorKind> {
        let header = peek_header(raw_jwt).map_err(|_| ErrorKind::ParseFailure)?;
        require_permitted_algorithm(&header).map_err(|_| ErrorKind::UnsupportedAlg)?;
        let kid = require_key_id(&header).map_err(|_| ErrorKind::UnknownKid)?;

        let key = self
            .key_loader
            .load_key(&kid)
            .await
            .map_err(|err| match err {
                KeyLoaderError::UnknownKid(_) => ErrorKind::UnknownKid,
                KeyLoaderError::CacheClosed => ErrorKind::UnknownKid,
            })?;

        let algorithm = header.alg;
        let claims = verify(raw_jwt, algorithm, &key.decoded.decoding_key).map_err(|err| {
            use tokeninfo_crypto::jwt::JwtError::*;
            match err {
                Expired => ErrorKind::Expired,
                _ => ErrorKind::BadSignature,
            }
        })?;

        let issued_at = claims.get("iat").and_then(Value::as_i64);
        if let Some(issued_at) = issued_at {
            let claim_map = string_claims(&claims);
            let input = RevocationCheckInput {
                raw_jwt,
                claims: &claim_map,
                issued_at,
            };
            match self.revocation.is_jwt_revoked(&input).await {
                Ok(true) => return Err(ErrorKind::Revoked),
                Ok(false) => {}
                Err(_) => debug!("revocation cache unavailable, treating as not revoked"),
            }
        } else {
            debug!("token has no iat claim, skipping revocation check");
        }

        let exp = claims.get("exp").and_then(Value::as_i64).unwrap_or(now);
        let expires_in = exp - now;

        let issuer = claims.get("iss").and_then(Value::as_str);
        match self.projectors.resolve(issuer) {
            Some(projector) => projector.project(raw_jwt, &claims, expires_in),
            None => self.default_projector.project(raw_jwt, &claims, expires_in),
        }
    }
}

fn string_claims(claims: &Value) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Value::Object(object) = claims {
        for (key, value) in object {
            if let Some(s) = value.as_str() {
                map.insert(key.clone(), s.to_string());
            }
        }
    }
    map
}
