//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::SiteConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Environment variables that override file settings.
pub const ENV_BACKEND_URL: &str = "COASTLINE_BACKEND_URL";
pub const ENV_ANON_KEY: &str = "COASTLINE_ANON_KEY";
pub const ENV_ADMIN_KEY: &str = "COASTLINE_ADMIN_KEY";

/// Load, override from the process environment, and validate.
///
/// A missing `path` yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => SiteConfig::default(),
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply overrides from `lookup` (normally the process environment).
pub fn apply_overrides<F>(config: &mut SiteConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.is_empty()) {
        tracing::info!(url = %url, "Backend URL overridden from environment");
        config.backend.url = Some(url);
    }
    if let Some(key) = lookup(ENV_ANON_KEY) {
        config.backend.anon_key = key;
    }
    if let Some(key) = lookup(ENV_ADMIN_KEY) {
        config.server.admin_api_key = key;
    }
}
