//! Configuration validation: required-URL fail-fast checks matching
//! `original_source/options/options.go`'s `log.Fatal` on a missing
//! upstream/provider URL, layered under the `validator` crate's field-level
//! checks the way the teacher's `ConfigValidator` does.

use crate::config::AppConfig;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("field validation failed: {0}")]
    Field(#[from] ValidationErrors),

    #[error("required configuration value missing: {0}")]
    MissingRequired(&'static str),
}

/// Deployment environment, named the way `RUST_ENV`/`APP_ENV` style
/// startup flags usually are. `Development` relaxes the hashing-salt
/// requirement so a developer can run the service with no revocation
/// secret configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        match std::env::var("ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
    config.validate()?;

    if config.upstream.tokeninfo_url.is_empty() {
        return Err(ConfigValidationError::MissingRequired("UPSTREAM_TOKENINFO_URL"));
    }
    if config.openid.provider_configuration_url.is_empty() {
        return Err(ConfigValidationError::MissingRequired(
            "OPENID_PROVIDER_CONFIGURATION_URL",
        ));
    }
    if config.revocation.provider_url.is_empty() {
        return Err(ConfigValidationError::MissingRequired("REVOCATION_PROVIDER_URL"));
    }

    if Environment::from_env() == Environment::Production && config.revocation.hashing_salt.is_none()
    {
        return Err(ConfigValidationError::MissingRequired("REVOCATION_HASHING_SALT"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.upstream.tokeninfo_url = "https://upstream.example/tokeninfo".to_string();
        config.openid.provider_configuration_url =
            "https://idp.example/.well-known/openid-configuration".to_string();
        config.revocation.provider_url = "https://revoke.example".to_string();
        config
    }

    #[test]
    fn valid_development_config_passes_without_salt() {
        std::env::remove_var("ENVIRONMENT");
        assert!(validate(&filled_config()).is_ok());
    }

    #[test]
    fn missing_upstream_url_is_rejected() {
        let config = AppConfig::default();
        assert!(matches!(
            validate(&config),
            Err(ConfigValidationError::MissingRequired("UPSTREAM_TOKENINFO_URL"))
        ));
    }

    #[test]
    fn production_requires_hashing_salt() {
        std::env::set_var("ENVIRONMENT", "production");
        let config = filled_config();
        let result = validate(&config);
        std::env::remove_var("ENVIRONMENT");
        assert!(matches!(
            result,
            Err(ConfigValidationError::MissingRequired("REVOCATION_HASHING_SALT"))
        ));
    }
}
