//! Configuration validation
//!
//! Validates critical configuration values at startup to catch misconfigurations early.

use anyhow::Result;
use facet_core::Config;

/// Validate critical configuration values
///
/// Fails fast if there are issues that could cause security problems or
/// runtime errors.
pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() {
        if config.cors_origins.contains(&"*".to_string()) {
            return Err(anyhow::anyhow!(
                "CORS configured to allow all origins (*) in production. \
                Please set specific allowed origins via CORS_ORIGINS."
            ));
        }
        if config.device_api_key.len() < 32 {
            return Err(anyhow::anyhow!(
                "DEVICE_API_KEY must be at least 32 characters in production"
            ));
        }
    }

    if config.db_max_connections == 0 {
        return Err(anyhow::anyhow!("Database max connections cannot be 0"));
    }

    if config.upload_url_ttl_seconds == 0 || config.upload_url_ttl_seconds > 86400 {
        return Err(anyhow::anyhow!(
            "UPLOAD_URL_TTL_SECONDS must be between 1 and 86400"
        ));
    }

    Ok(())
}
