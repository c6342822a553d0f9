pub mod cache;
pub mod puller;
pub mod types;

pub use cache::{RevocationCache, RevocationCheckInput};
pub use puller::RevocationPuller;
pub use types::{validate_raw, RawRevocation, Revocation, RevocationValidationError};
