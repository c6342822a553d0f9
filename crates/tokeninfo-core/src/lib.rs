//! Core tokeninfo business logic: JWT validation, the JWKS key loader, the
//! revocation cache and delta puller, the opaque-token proxy cache, the
//! circuit-breaker-guarded HTTP client, the periodic scheduler, and bearer
//! extraction for the tokeninfo routing handler. Independent of HTTP
//! framework and storage concerns, which live in `tokeninfo-api`.

pub mod error;
pub mod http_client;
pub mod jwks;
pub mod jwt_validator;
pub mod model;
pub mod proxy;
pub mod resilience;
pub mod revocation;
pub mod routing;
pub mod scheduler;

pub use error::{ClaimKind, ErrorKind, OAuthError, UpstreamErrorClass};
pub use http_client::{HttpCallError, HttpClient};
pub use jwks::{CachedKey, KeyLoader, KeyLoaderError};
pub use jwt_validator::{ClaimProjector, JwtValidator, ProjectorRegistry};
pub use model::{ErrorResponse, TokenInfo};
pub use proxy::{looks_like_uuid, ProxyCache, ProxyError, ProxyOutcome};
pub use resilience::CircuitBreakerRegistry;
pub use revocation::{RevocationCache, RevocationCheckInput, RevocationPuller};
pub use routing::extract_bearer;
