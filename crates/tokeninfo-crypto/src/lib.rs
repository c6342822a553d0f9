pub mod hashing;
pub mod jwt;
pub mod keys;

pub use hashing::{pipe_join, salted_sha256_base64};
pub use jwt::{JwtError, PERMITTED_ALGORITHMS};
pub use keys::{decode_key, DecodedKey, KeyError, RawJsonWebKey};
