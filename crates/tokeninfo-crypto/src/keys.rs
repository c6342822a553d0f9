//! JWKS key material decoding.
//!
//! Decodes the RSA/ECDSA public-key entries of a JSON Web Key Set into
//! `jsonwebtoken::DecodingKey`s. Coordinates arrive base64url-without-padding
//! per RFC 7517 and are handed straight to `jsonwebtoken`'s component
//! constructors rather than assembled into `BigUint`s by hand.

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),
    #[error("unsupported EC curve: {0}")]
    UnsupportedCurve(String),
    #[error("key entry missing required field: {0}")]
    MissingField(&'static str),
    #[error("key material rejected by decoder: {0}")]
    InvalidMaterial(String),
}

/// One raw entry from a JWKS `keys` array, as received over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawJsonWebKey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    pub kty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

/// A decoded, ready-to-verify-with key plus the metadata the validator and
/// the `/oauth2/connect/keys` endpoint need alongside it.
#[derive(Clone)]
pub struct DecodedKey {
    pub kid: String,
    pub decoding_key: jsonwebtoken::DecodingKey,
    pub allowed_algorithms: Vec<Algorithm>,
    pub use_: Option<String>,
}

/// Decodes one JWKS entry, dispatching on `kty` the way
/// `jsonWebKey.UnmarshalJSON`'s tagged union does in the reference
/// implementation.
pub fn decode_key(raw: &RawJsonWebKey) -> Result<DecodedKey, KeyError> {
    let kid = raw
        .kid
        .clone()
        .ok_or(KeyError::MissingField("kid"))?;

    match raw.kty.as_str() {
        "RSA" => {
            let n = raw.n.as_deref().ok_or(KeyError::MissingField("n"))?;
            let e = raw.e.as_deref().ok_or(KeyError::MissingField("e"))?;
            let decoding_key = jsonwebtoken::DecodingKey::from_rsa_components(n, e)
                .map_err(|err| KeyError::InvalidMaterial(err.to_string()))?;
            Ok(DecodedKey {
                kid,
                decoding_key,
                allowed_algorithms: vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512],
                use_: raw.use_.clone(),
            })
        }
        "EC" => {
            let crv = raw.crv.as_deref().ok_or(KeyError::MissingField("crv"))?;
            let x = raw.x.as_deref().ok_or(KeyError::MissingField("x"))?;
            let y = raw.y.as_deref().ok_or(KeyError::MissingField("y"))?;
            // jsonwebtoken has no ES512/P-521 algorithm variant, so a P-521 key
            // decodes with an empty `allowed_algorithms`: it is inventoried and
            // published via `/oauth2/connect/keys` like any other key, but can
            // never be selected to verify a JWT.
            let allowed_algorithms = match crv {
                "P-256" => vec![Algorithm::ES256],
                "P-384" => vec![Algorithm::ES384],
                "P-521" => vec![],
                other => return Err(KeyError::UnsupportedCurve(other.to_string())),
            };
            let decoding_key = jsonwebtoken::DecodingKey::from_ec_components(x, y)
                .map_err(|err| KeyError::InvalidMaterial(err.to_string()))?;
            Ok(DecodedKey {
                kid,
                decoding_key,
                allowed_algorithms,
                use_: raw.use_.clone(),
            })
        }
        other => Err(KeyError::UnsupportedKeyType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_jwk() -> RawJsonWebKey {
        // A syntactically valid, arbitrary 2048-bit RSA modulus/exponent pair
        // (not tied to any real key), sized the way OIDC providers publish.
        RawJsonWebKey {
            kid: Some("key-1".to_string()),
            kty: "RSA".to_string(),
            alg: Some("RS256".to_string()),
            use_: Some("sig".to_string()),
            n: Some(concat!(
                "wG1TnOQwq2sc4tNtvp7ffQEs9hWBUDdKXpFImkMtc6LOS_AtPr7rZXvHlvdREmtiaigXUG8-",
                "L1SSmyI1RTDKfyzbLZSqdVEA54TgCu7hZF5Vv0jFz73xRJ99OrlwuDUGxTFDVrH8xFeL_9fRM3"
            )
            .to_string()),
            e: Some("AQAB".to_string()),
            crv: None,
            x: None,
            y: None,
        }
    }

    #[test]
    fn decodes_rsa_key() {
        let decoded = decode_key(&rsa_jwk()).unwrap();
        assert_eq!(decoded.kid, "key-1");
        assert!(decoded.allowed_algorithms.contains(&Algorithm::RS256));
    }

    #[test]
    fn rejects_unsupported_kty() {
        let raw = RawJsonWebKey {
            kid: Some("k".to_string()),
            kty: "oct".to_string(),
            alg: None,
            use_: None,
            n: None,
            e: None,
            crv: None,
            x: None,
            y: None,
        };
        assert_eq!(
            decode_key(&raw).unwrap_err(),
            KeyError::UnsupportedKeyType("oct".to_string())
        );
    }

    #[test]
    fn rejects_missing_kid() {
        let mut raw = rsa_jwk();
        raw.kid = None;
        assert_eq!(decode_key(&raw).unwrap_err(), KeyError::MissingField("kid"));
    }

    #[test]
    fn rejects_unsupported_curve() {
        let raw = RawJsonWebKey {
            kid: Some("k".to_string()),
            kty: "EC".to_string(),
            alg: None,
            use_: None,
            n: None,
            e: None,
            crv: Some("P-999".to_string()),
            x: Some("AA".to_string()),
            y: Some("AA".to_string()),
        };
        assert!(matches!(decode_key(&raw), Err(KeyError::UnsupportedCurve(_))));
    }

    #[test]
    fn p521_decodes_with_no_selectable_algorithm() {
        let raw = RawJsonWebKey {
            kid: Some("p521-key".to_string()),
            kty: "EC".to_string(),
            alg: Some("ES512".to_string()),
            use_: Some("sig".to_string()),
            n: None,
            e: None,
            crv: Some("P-521".to_string()),
            x: Some("AA".to_string()),
            y: Some("AA".to_string()),
        };
        let decoded = decode_key(&raw).unwrap();
        assert_eq!(decoded.kid, "p521-key");
        assert!(decoded.allowed_algorithms.is_empty());
    }
}
